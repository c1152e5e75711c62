use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

use crate::error::{IngestError, Result};

/// One row of `user_logins`, built from a masked and flattened event.
///
/// `masked_ip` and `masked_device_id` hold digests, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRow {
    pub user_id: String,
    pub device_type: String,
    pub masked_ip: String,
    pub masked_device_id: String,
    pub locale: String,
    pub app_version: String,
    pub create_date: Option<NaiveDate>,
}

impl TryFrom<&Map<String, Value>> for LoginRow {
    type Error = IngestError;

    fn try_from(flat: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            user_id: required_text(flat, "user_id")?,
            device_type: required_text(flat, "device_type")?,
            masked_ip: required_text(flat, "ip")?,
            masked_device_id: required_text(flat, "device_id")?,
            locale: required_text(flat, "locale")?,
            app_version: required_text(flat, "app_version")?,
            create_date: optional_date(flat, "create_date")?,
        })
    }
}

fn required_text(flat: &Map<String, Value>, field: &str) -> Result<String> {
    let value = flat
        .get(field)
        .ok_or_else(|| IngestError::MissingField(field.to_string()))?;
    scalar_text(field, value)?.ok_or_else(|| IngestError::InvalidField {
        field: field.to_string(),
        reason: "value is null".to_string(),
    })
}

fn optional_text(flat: &Map<String, Value>, field: &str) -> Result<Option<String>> {
    match flat.get(field) {
        Some(value) => scalar_text(field, value),
        None => Ok(None),
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (date part kept).
fn optional_date(flat: &Map<String, Value>, field: &str) -> Result<Option<NaiveDate>> {
    let Some(text) = optional_text(flat, field)? else {
        return Ok(None);
    };

    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(&text).map(|ts| ts.date_naive()))
        .map(Some)
        .map_err(|_| IngestError::InvalidField {
            field: field.to_string(),
            reason: format!("'{}' is not a calendar date", text),
        })
}

/// Render a JSON scalar as column text. Numbers keep their JSON spelling,
/// so an integer `app_version` of 2 is stored as "2".
fn scalar_text(field: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(IngestError::InvalidField {
            field: field.to_string(),
            reason: "expected a scalar value".to_string(),
        }),
    }
}

/// A row read back from `user_logins`, every column rendered as text
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredLogin {
    pub user_id: Option<String>,
    pub device_type: Option<String>,
    pub masked_ip: Option<String>,
    pub masked_device_id: Option<String>,
    pub locale: Option<String>,
    pub app_version: Option<String>,
    pub create_date: Option<String>,
}

/// Counters for one consumer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Messages returned by the queue
    pub received: usize,
    /// Rows written to `user_logins`
    pub inserted: usize,
    /// Marker messages discarded by the classifier
    pub rejected: usize,
    /// Messages skipped after a message error
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn complete_event() -> Map<String, Value> {
        as_map(json!({
            "user_id": "u1",
            "device_type": "mobile",
            "ip": "masked-ip",
            "device_id": "masked-device",
            "locale": "en-US",
            "app_version": "9.3.1"
        }))
    }

    #[test]
    fn test_row_from_complete_event() {
        let row = LoginRow::try_from(&complete_event()).unwrap();
        assert_eq!(row.user_id, "u1");
        assert_eq!(row.device_type, "mobile");
        assert_eq!(row.masked_ip, "masked-ip");
        assert_eq!(row.masked_device_id, "masked-device");
        assert_eq!(row.locale, "en-US");
        assert_eq!(row.app_version, "9.3.1");
        assert_eq!(row.create_date, None);
    }

    #[test]
    fn test_numeric_app_version_is_coerced_to_text() {
        let mut event = complete_event();
        event.insert("app_version".into(), json!(2));
        assert_eq!(LoginRow::try_from(&event).unwrap().app_version, "2");
    }

    #[test]
    fn test_create_date_is_kept_when_present() {
        let mut event = complete_event();
        event.insert("create_date".into(), json!("2023-07-14"));
        assert_eq!(
            LoginRow::try_from(&event).unwrap().create_date,
            NaiveDate::from_ymd_opt(2023, 7, 14)
        );

        event.insert("create_date".into(), json!("2023-07-14T09:30:00Z"));
        assert_eq!(
            LoginRow::try_from(&event).unwrap().create_date,
            NaiveDate::from_ymd_opt(2023, 7, 14)
        );

        event.insert("create_date".into(), Value::Null);
        assert_eq!(LoginRow::try_from(&event).unwrap().create_date, None);
    }

    #[test]
    fn test_each_missing_required_field_fails() {
        for field in ["user_id", "device_type", "ip", "device_id", "locale", "app_version"] {
            let mut event = complete_event();
            event.remove(field);

            match LoginRow::try_from(&event) {
                Err(IngestError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("expected MissingField({}), got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_nested_required_field_is_invalid() {
        let mut event = complete_event();
        event.insert("locale".into(), json!(["en-US", "fr-FR"]));
        assert!(matches!(
            LoginRow::try_from(&event),
            Err(IngestError::InvalidField { .. })
        ));

        event.insert("locale".into(), Value::Null);
        assert!(matches!(
            LoginRow::try_from(&event),
            Err(IngestError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_unparseable_create_date_is_invalid() {
        for bad in [json!("yesterday-ish"), json!("2023-02-30"), json!(20230714)] {
            let mut event = complete_event();
            event.insert("create_date".into(), bad.clone());

            match LoginRow::try_from(&event) {
                Err(IngestError::InvalidField { field, .. }) => assert_eq!(field, "create_date"),
                other => panic!("expected InvalidField for {}, got {:?}", bad, other),
            }
        }
    }
}
