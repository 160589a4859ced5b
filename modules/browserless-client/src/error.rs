use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Render timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for BrowserlessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return BrowserlessError::Timeout { timeout_ms: 0 };
        }
        BrowserlessError::Network(err.to_string())
    }
}
