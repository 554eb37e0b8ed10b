use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server rejected the statement.
    #[error("Query error: {message}")]
    Query { message: String, code: Option<u16> },

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Timeout error.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn query(message: impl Into<String>) -> Self {
        Error::Query {
            message: message.into(),
            code: None,
        }
    }

    /// Server error code, when the server reported one.
    pub fn code(&self) -> Option<u16> {
        match self {
            Error::Query { code, .. } => *code,
            _ => None,
        }
    }
}
