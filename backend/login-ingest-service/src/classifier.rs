use serde_json::{Map, Value};

/// Field and value that producers use to mark deliberately malformed test messages
pub const INVALID_MARKER_FIELD: &str = "foo";
pub const INVALID_MARKER_VALUE: &str = "oops_wrong_msg_type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Valid,
    InvalidTestMessage,
}

/// Classify a parsed message body. Only the exact marker pair is rejected.
pub fn classify(event: &Map<String, Value>) -> Classification {
    match event.get(INVALID_MARKER_FIELD) {
        Some(Value::String(value)) if value == INVALID_MARKER_VALUE => {
            Classification::InvalidTestMessage
        }
        _ => Classification::Valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify_json(value: Value) -> Classification {
        match value {
            Value::Object(map) => classify(&map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_marker_message_is_rejected() {
        assert_eq!(
            classify_json(json!({"foo": "oops_wrong_msg_type"})),
            Classification::InvalidTestMessage
        );
        assert_eq!(
            classify_json(json!({"foo": "oops_wrong_msg_type", "user_id": "u1"})),
            Classification::InvalidTestMessage
        );
    }

    #[test]
    fn test_login_event_is_valid() {
        let event = json!({
            "user_id": "u1",
            "device_type": "mobile",
            "ip": "1.2.3.4",
            "device_id": "d1",
            "locale": "en-US",
            "app_version": "9.3.1"
        });
        assert_eq!(classify_json(event), Classification::Valid);
    }

    #[test]
    fn test_marker_field_with_other_value_is_valid() {
        assert_eq!(classify_json(json!({"foo": "bar"})), Classification::Valid);
        assert_eq!(classify_json(json!({"foo": null})), Classification::Valid);
    }
}
