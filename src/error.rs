use thiserror::Error;

#[derive(Error, Debug)]
pub enum CfnError {
    #[error("Login required: {0}")]
    AuthRequired(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

// Timed-out requests and dead connections are reported to callers
// differently, so the reqwest conversion has to split them.
impl From<reqwest::Error> for CfnError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CfnError::Timeout(err.to_string())
        } else {
            CfnError::Transport(err.to_string())
        }
    }
}

impl From<CfnError> for String {
    fn from(error: CfnError) -> Self {
        error.to_string()
    }
}

impl serde::Serialize for CfnError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CfnError>;
