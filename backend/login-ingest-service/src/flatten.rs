//! Flattening of nested JSON objects into dot-joined keys.

use serde_json::{Map, Value};

pub const KEY_SEPARATOR: char = '.';

/// Inline every nested object, re-keying its leaves as `parent.child`.
///
/// Scalars and arrays are copied under their original key.
pub fn flatten(object: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, None, object);
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, prefix: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let path = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, KEY_SEPARATOR, key),
            None => key.clone(),
        };

        match value {
            Value::Object(child) => flatten_into(flat, Some(&path), child),
            leaf => {
                flat.insert(path, leaf.clone());
            }
        }
    }
}

/// Rebuild the nested form of a flattened mapping by splitting keys on `.`.
///
/// If a path collides with an existing leaf, the later entry wins.
pub fn unflatten(flat: &Map<String, Value>) -> Map<String, Value> {
    let mut root = Map::new();

    for (path, value) in flat {
        let mut segments = path.split(KEY_SEPARATOR).peekable();
        let mut node = &mut root;

        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                node.insert(segment.to_string(), value.clone());
                break;
            }

            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            node = match entry {
                Value::Object(child) => child,
                _ => unreachable!("entry was just replaced with an object"),
            };
        }
    }

    root
}
