//! Receive → classify → mask → flatten → persist, one message at a time.

use serde_json::Value;
use tracing::{error, info, warn};

use crate::classifier::{classify, Classification};
use crate::config::FailurePolicy;
use crate::error::{IngestError, Result};
use crate::flatten::flatten;
use crate::masking::mask_pii;
use crate::models::{LoginRow, RunReport};
use crate::queue::{MessageSource, QueueMessage};
use crate::store::LoginSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Inserted,
    /// Marker message, discarded without writing a row
    Rejected,
}

pub struct LoginPipeline<S, K> {
    source: S,
    sink: K,
    failure_policy: FailurePolicy,
}

impl<S: MessageSource, K: LoginSink> LoginPipeline<S, K> {
    pub fn new(source: S, sink: K, failure_policy: FailurePolicy) -> Self {
        Self {
            source,
            sink,
            failure_policy,
        }
    }

    /// Fetch one batch and push every message through the pipeline.
    ///
    /// Queue and storage errors always abort. Message errors (see
    /// [`IngestError::is_message_error`]) abort under `FailurePolicy::Abort` and
    /// are counted in `failed` under `Skip`.
    pub async fn run(&self) -> Result<RunReport> {
        let messages = self.source.receive_batch().await?;
        let mut report = RunReport {
            received: messages.len(),
            ..RunReport::default()
        };

        info!("Number of messages retrieved: {}", messages.len());
        if messages.is_empty() {
            info!("No messages found in the queue");
            return Ok(report);
        }

        for message in &messages {
            match self.process_message(message).await {
                Ok(MessageOutcome::Inserted) => report.inserted += 1,
                Ok(MessageOutcome::Rejected) => report.rejected += 1,
                Err(e) if e.is_message_error() && self.failure_policy == FailurePolicy::Skip => {
                    error!(message_id = %message.message_id, error = %e, "Skipping message");
                    report.failed += 1;
                }
                Err(e) => {
                    error!(
                        message_id = %message.message_id,
                        error = %e,
                        inserted = report.inserted,
                        "Aborting run"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            received = report.received,
            inserted = report.inserted,
            rejected = report.rejected,
            failed = report.failed,
            "Batch processed"
        );
        Ok(report)
    }

    pub async fn process_message(&self, message: &QueueMessage) -> Result<MessageOutcome> {
        let event = match serde_json::from_str::<Value>(&message.body)? {
            Value::Object(event) => event,
            other => {
                return Err(IngestError::MalformedMessage(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        if classify(&event) == Classification::InvalidTestMessage {
            warn!(
                message_id = %message.message_id,
                "Received a message with an invalid message type"
            );
            return Ok(MessageOutcome::Rejected);
        }

        let masked = mask_pii(&event);
        let flat = flatten(&masked);
        let row = LoginRow::try_from(&flat)?;
        self.sink.insert_login(&row).await?;

        Ok(MessageOutcome::Inserted)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct NoSource;

    #[async_trait]
    impl MessageSource for NoSource {
        async fn receive_batch(&self) -> Result<Vec<QueueMessage>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct VecSink(Mutex<Vec<LoginRow>>);

    #[async_trait]
    impl LoginSink for VecSink {
        async fn insert_login(&self, row: &LoginRow) -> Result<()> {
            self.0.lock().unwrap().push(row.clone());
            Ok(())
        }
    }

    fn message(body: &str) -> QueueMessage {
        QueueMessage {
            message_id: "m".to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_non_object_body_is_malformed() {
        let pipeline = LoginPipeline::new(NoSource, VecSink::default(), FailurePolicy::Abort);

        for body in ["[1,2]", "\"text\"", "42", "null"] {
            let err = pipeline.process_message(&message(body)).await.unwrap_err();
            assert!(matches!(err, IngestError::MalformedMessage(_)), "{}", body);
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_message_error() {
        let pipeline = LoginPipeline::new(NoSource, VecSink::default(), FailurePolicy::Abort);
        let err = pipeline.process_message(&message("{not json")).await.unwrap_err();
        assert!(matches!(err, IngestError::Json(_)));
        assert!(err.is_message_error());
    }

    #[tokio::test]
    async fn test_nested_event_is_flattened_before_extraction() {
        let pipeline = LoginPipeline::new(NoSource, VecSink::default(), FailurePolicy::Abort);
        let body = r#"{"user_id":"u9","device_type":"web","ip":"9.9.9.9","device_id":"d9",
                       "locale":"de-DE","app_version":"1.0","client":{"browser":"firefox"}}"#;

        let outcome = pipeline.process_message(&message(body)).await.unwrap();
        assert_eq!(outcome, MessageOutcome::Inserted);
        assert_eq!(pipeline.sink.0.lock().unwrap()[0].user_id, "u9");
    }
}
