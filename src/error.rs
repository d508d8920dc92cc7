/// Error types for flowsense
///
/// The predictive model itself is total (empty results instead of errors).
/// Everything that touches disk, the database, or user-supplied config
/// reports through `FlowsenseError`.

use thiserror::Error;

/// Main error type for flowsense operations
#[derive(Error, Debug)]
pub enum FlowsenseError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O errors (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Action rejected before entering the action log
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Action contains sensitive data
    #[error("Action contains sensitive data and was not recorded")]
    SensitiveData,

    /// Action exceeds maximum length
    #[error("Action exceeds maximum allowed length of {0} characters")]
    ActionTooLong(usize),

    /// Workflow catalog could not be read
    #[error("Workflow catalog error: {0}")]
    Catalog(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for flowsense operations
pub type Result<T> = std::result::Result<T, FlowsenseError>;

impl FlowsenseError {
    /// Convert to a short message suitable for the terminal
    pub fn user_message(&self) -> String {
        match self {
            FlowsenseError::Database(e) => {
                format!("Database error occurred. Please try again. Details: {}", e)
            }
            FlowsenseError::Io(e) => {
                format!("File system error. Check permissions. Details: {}", e)
            }
            FlowsenseError::Serialization(e) => format!("Data format error: {}", e),
            FlowsenseError::Timestamp(e) => format!("Stored history is corrupt: {}", e),
            FlowsenseError::Config(msg) => format!("Configuration issue: {}", msg),
            FlowsenseError::InvalidAction(reason) => format!("Invalid action: {}", reason),
            FlowsenseError::SensitiveData => {
                "Action contains sensitive data and was not recorded".to_string()
            }
            FlowsenseError::ActionTooLong(max) => {
                format!("Action exceeds maximum length of {} characters", max)
            }
            FlowsenseError::Catalog(msg) => format!("Could not load workflows: {}", msg),
            FlowsenseError::Generic(msg) => msg.clone(),
        }
    }
}
