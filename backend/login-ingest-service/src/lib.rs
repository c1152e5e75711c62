pub mod classifier;
pub mod config;
pub mod dump;
pub mod error;
pub mod flatten;
pub mod masking;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod store;

pub use config::{Config, FailurePolicy, QueueConfig};
pub use error::{IngestError, Result};
pub use models::*;
pub use pipeline::{LoginPipeline, MessageOutcome};
pub use queue::{MessageSource, QueueMessage, SqsQueueReader};
pub use store::{LoginSink, LoginStore, SchemaFixup};
