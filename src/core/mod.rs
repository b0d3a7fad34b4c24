//! Core error taxonomy and shared result type.

pub mod config;

pub use config::{ConfigManager, Credentials, DmConfig};

use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

// Playwright surfaces errors both bare and behind Arc depending on the call
// site; both collapse to the string-only Browser variant.
impl From<playwright::Error> for DmError {
    fn from(e: playwright::Error) -> Self {
        DmError::Browser(e.to_string())
    }
}

impl From<Arc<playwright::Error>> for DmError {
    fn from(e: Arc<playwright::Error>) -> Self {
        DmError::Browser(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_keep_context() {
        let e = DmError::LoginFailed("username field not found".into());
        assert_eq!(e.to_string(), "Login failed: username field not found");

        let e = DmError::Navigation("all inbox routes exhausted".into());
        assert!(e.to_string().contains("inbox routes"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: DmError = io.into();
        assert!(matches!(e, DmError::Io(_)));
    }
}
