//! Error types for JK Hub

use thiserror::Error;

/// Result type alias using JK Hub's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for JK Hub
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// GigaChat OAuth error
    #[error("GigaChat auth error: {0}")]
    Auth(String),

    /// GigaChat API error
    #[error("GigaChat API error: {0}")]
    GigaChat(String),

    /// Web search API error
    #[error("Search error: {0}")]
    Search(String),

    /// Telegram bot error
    #[error("Telegram error: {0}")]
    Telegram(String),

    /// Storage error (history / community store files)
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unauthorized access (expired or rejected token)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::RateLimit(_) | Error::Unauthorized(_)
        )
    }

    /// Check if error is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::RateLimit("slow down".into()).is_retryable());
        assert!(Error::Unauthorized("token expired".into()).is_retryable());
        assert!(!Error::InvalidInput("bad args".into()).is_retryable());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidInput("missing topic".into()).is_client_error());
        assert!(!Error::GigaChat("500".into()).is_client_error());
    }
}
