//! SQS queue reader
//!
//! Receives one batch of login events per run. Nothing is deleted from the
//! queue: received messages stay invisible for the visibility timeout and are
//! then redelivered by SQS itself.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::{Credentials, Region};
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use aws_sdk_sqs::Client;
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::error::{IngestError, Result};

/// A received message with a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    pub body: String,
}

/// Source of login-event messages for one run
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Fetch a single batch; an empty vector means the queue had nothing pending
    async fn receive_batch(&self) -> Result<Vec<QueueMessage>>;
}

/// Reads a named SQS queue (or a LocalStack emulation of it)
pub struct SqsQueueReader {
    client: Client,
    queue_url: String,
    config: QueueConfig,
}

impl SqsQueueReader {
    /// Build the SQS client and resolve the configured queue name to its URL
    pub async fn connect(config: QueueConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        // Static credentials when given (LocalStack), otherwise the default chain
        if let Some((access_key_id, secret_access_key)) = config.static_credentials() {
            let credentials = Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "login_ingest_static",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = config.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
            loader = loader.endpoint_url(endpoint);
        }

        let client = Client::new(&loader.load().await);

        let response = client
            .get_queue_url()
            .queue_name(&config.queue_name)
            .send()
            .await
            .map_err(|e| {
                IngestError::Queue(format!(
                    "failed to resolve queue '{}': {}",
                    config.queue_name,
                    DisplayErrorContext(&e)
                ))
            })?;

        let queue_url = response
            .queue_url()
            .ok_or_else(|| {
                IngestError::Queue(format!("no URL returned for queue '{}'", config.queue_name))
            })?
            .to_string();

        info!(queue = %config.queue_name, queue_url = %queue_url, "Resolved SQS queue");

        Ok(Self {
            client,
            queue_url,
            config,
        })
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl MessageSource for SqsQueueReader {
    async fn receive_batch(&self) -> Result<Vec<QueueMessage>> {
        debug!(
            queue_url = %self.queue_url,
            max_messages = self.config.max_messages,
            visibility_timeout_secs = self.config.visibility_timeout_secs,
            wait_time_secs = self.config.wait_time_secs,
            "Receiving messages"
        );

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.config.max_messages)
            .visibility_timeout(self.config.visibility_timeout_secs)
            .wait_time_seconds(self.config.wait_time_secs)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| {
                IngestError::Queue(format!("receive_message failed: {}", DisplayErrorContext(&e)))
            })?;

        let mut messages = Vec::new();
        for message in output.messages() {
            let message_id = message.message_id().unwrap_or("<unknown>").to_string();
            match message.body() {
                Some(body) => messages.push(QueueMessage {
                    message_id,
                    body: body.to_string(),
                }),
                None => warn!(message_id = %message_id, "Skipping message without a body"),
            }
        }

        Ok(messages)
    }
}
