//! Client error types

use shared::ErrorCode;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Missing, expired or rejected token; the cached session is gone
    #[error("Authentication required")]
    Unauthorized,

    /// Server rejected the call with a structured error body
    #[error("{message} (code {code})")]
    Api {
        code: u16,
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Server failed without a structured error body
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Server error code, when the server sent one
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Api { code, .. } => ErrorCode::try_from(*code).ok(),
            ClientError::Unauthorized => Some(ErrorCode::NotAuthenticated),
            _ => None,
        }
    }

    /// Text suitable for a notice shown to the customer
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Unauthorized => "Please log in again".to_string(),
            ClientError::Http(e) if e.is_timeout() => "The server took too long to respond".to_string(),
            ClientError::Http(_) => "Could not reach the server".to_string(),
            _ => "Something went wrong, please try again".to_string(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
