//! Error taxonomy for the streaming query pipeline.

use thiserror::Error;

/// Result type alias for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors that can terminate a streaming review query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Transport-level failure while issuing a request or reading chunks.
    #[error("network error: {message}")]
    Network { message: String },

    /// A stream line that is not valid JSON or matches neither expected shape.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Explicit `{error}` sentinel reported by the server.
    #[error("server error: {message}")]
    Server { message: String },

    /// Deliberate abort. Never surfaced to the consumer as a failure.
    #[error("query cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for QueryError {
    fn from(value: reqwest::Error) -> Self {
        QueryError::Network {
            message: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(value: serde_json::Error) -> Self {
        QueryError::Protocol {
            message: value.to_string(),
        }
    }
}

impl QueryError {
    pub fn protocol<S: std::fmt::Display>(msg: S) -> Self {
        QueryError::Protocol {
            message: format!("{}", msg),
        }
    }

    pub fn server<S: std::fmt::Display>(msg: S) -> Self {
        QueryError::Server {
            message: format!("{}", msg),
        }
    }
}
