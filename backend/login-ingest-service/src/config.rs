//! Configuration management
use db_pool::DbConfig;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{IngestError, Result};

pub const SERVICE_NAME: &str = "login-ingest-service";

#[derive(Debug, Clone)]
pub struct Config {
    pub queue: QueueConfig,
    pub database: DbConfig,
    pub failure_policy: FailurePolicy,
}

/// SQS connection and receive settings, read from `SQS_*` env vars.
///
/// Defaults target a LocalStack instance on the developer machine.
#[derive(Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_name")]
    pub queue_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint (LocalStack); `None` uses the regional AWS endpoint
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_access_key_id")]
    pub access_key_id: Option<String>,
    #[serde(default = "default_secret_access_key")]
    pub secret_access_key: Option<String>,
    #[serde(default = "default_max_messages")]
    pub max_messages: i32,
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: i32,
    #[serde(default = "default_wait_time_secs")]
    pub wait_time_secs: i32,
}

fn default_queue_name() -> String {
    "login-queue".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_endpoint_url() -> Option<String> {
    Some("http://localhost:4566/".to_string())
}

fn default_access_key_id() -> Option<String> {
    Some("dummy_access_key".to_string())
}

fn default_secret_access_key() -> Option<String> {
    Some("dummy_secret_key".to_string())
}

fn default_max_messages() -> i32 {
    100
}

fn default_visibility_timeout_secs() -> i32 {
    30
}

fn default_wait_time_secs() -> i32 {
    20
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_name: default_queue_name(),
            region: default_region(),
            endpoint_url: default_endpoint_url(),
            access_key_id: default_access_key_id(),
            secret_access_key: default_secret_access_key(),
            max_messages: default_max_messages(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            wait_time_secs: default_wait_time_secs(),
        }
    }
}

impl fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueConfig")
            .field("queue_name", &self.queue_name)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("max_messages", &self.max_messages)
            .field("visibility_timeout_secs", &self.visibility_timeout_secs)
            .field("wait_time_secs", &self.wait_time_secs)
            .finish()
    }
}

impl QueueConfig {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("SQS_").from_env::<QueueConfig>()?)
    }

    /// Access key pair for a static provider. `None` when either part is unset
    /// or empty, so `SQS_ACCESS_KEY_ID=` selects the default credential chain.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        let access_key_id = self.access_key_id.as_deref().filter(|k| !k.is_empty())?;
        let secret_access_key = self.secret_access_key.as_deref().filter(|k| !k.is_empty())?;
        Some((access_key_id, secret_access_key))
    }
}

/// What to do when a single message cannot be turned into a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run at the first bad message.
    #[default]
    Abort,
    /// Log the message error and continue with the rest of the batch.
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(IngestError::Config(format!(
                "FAILURE_POLICY must be 'abort' or 'skip', got '{}'",
                other
            ))),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let failure_policy = match std::env::var("FAILURE_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => FailurePolicy::default(),
        };

        Ok(Self {
            queue: QueueConfig::from_env()?,
            database: DbConfig::for_service(SERVICE_NAME),
            failure_policy,
        })
    }
}
