use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Local time does not exist in display zone: {0}")]
    NonexistentLocalTime(String),
    #[error("Invalid calendar signal: {0}")]
    InvalidSignal(String),
}

impl InfraError {
    /// Transport failures that may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            InfraError::Http(message) => {
                let message = message.to_ascii_lowercase();
                message.contains("network error")
                    || message.contains("timeout")
                    || message.contains("timed out")
                    || message.contains("temporarily unavailable")
                    || message.contains("connection reset")
            }
            _ => false,
        }
    }
}
