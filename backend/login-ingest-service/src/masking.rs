//! One-way masking of personally identifiable fields.
//!
//! Values are replaced by their SHA-256 digest in lowercase hex. The digest is
//! deterministic, so masked columns can still be joined or counted across runs
//! without the plaintext ever reaching storage.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Top-level keys whose values are masked before persistence
pub const PII_FIELDS: [&str; 2] = ["device_id", "ip"];

/// Compute the lowercase hex SHA-256 digest of `input`
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Return a copy of `event` with every present PII field replaced by its digest.
///
/// Strings are hashed over their contents, numbers and booleans over their JSON
/// spelling. Null, arrays and objects are left as they are so row extraction
/// rejects them. Absent fields stay absent.
pub fn mask_pii(event: &Map<String, Value>) -> Map<String, Value> {
    let mut masked = event.clone();

    for field in PII_FIELDS {
        if let Some(value) = masked.get_mut(field) {
            let plaintext = match &*value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => continue,
            };
            *value = Value::String(sha256_hex(&plaintext));
        }
    }

    masked
}
