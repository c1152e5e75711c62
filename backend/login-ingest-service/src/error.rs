use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

/// SQLSTATE class for data exceptions
const DATA_EXCEPTION_CLASS: &str = "22";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Errors caused by the content of a single message rather than by the
    /// queue or the database. Only these may be skipped under `FailurePolicy::Skip`.
    ///
    /// A database error counts when Postgres rejected the row's data
    /// (SQLSTATE class 22, e.g. a value too long for its column).
    pub fn is_message_error(&self) -> bool {
        match self {
            IngestError::Json(_)
            | IngestError::MalformedMessage(_)
            | IngestError::MissingField(_)
            | IngestError::InvalidField { .. } => true,
            IngestError::Database(err) => err
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code.starts_with(DATA_EXCEPTION_CLASS)),
            IngestError::Queue(_) | IngestError::Config(_) => false,
        }
    }
}

impl From<envy::Error> for IngestError {
    fn from(err: envy::Error) -> Self {
        IngestError::Config(err.to_string())
    }
}
