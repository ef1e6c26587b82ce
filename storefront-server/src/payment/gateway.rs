//! Payment gateway abstraction
//!
//! Every provider call returns a tagged [`GatewayOutcome`]: the provider
//! either accepted the request or answered with a definite failure.
//! Anything that prevented a definite answer (timeouts, connection errors,
//! provider 5xx, unreadable bodies) is an `Err(GatewayError)`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::error::AppError;
use thiserror::Error;

/// Hosted checkout request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeParams {
    pub tx_ref: String,
    pub amount: f64,
    pub currency: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    /// Provider-to-server notification URL
    pub callback_url: String,
    /// Where the browser lands after checkout
    pub return_url: String,
    pub title: String,
    pub description: String,
}

impl InitializeParams {
    /// Split a display name into first and last name; last name defaults to `User`
    pub fn split_name(full_name: &str) -> (String, String) {
        let mut parts = full_name.split_whitespace();
        let first = parts.next().unwrap_or("Customer").to_string();
        let last = parts.next().unwrap_or("User").to_string();
        (first, last)
    }
}

/// A hosted checkout session created by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

/// Provider-confirmed payment
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPayment {
    pub tx_ref: String,
    pub amount: f64,
    pub currency: String,
}

/// Definite non-success answer from the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    /// Provider-reported status, when it sent one
    pub status: Option<String>,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOutcome<T> {
    Success(T),
    Failure(ProviderFailure),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("payment provider timed out")]
    Timeout,

    #[error("payment provider unreachable: {0}")]
    Transport(String),

    #[error("payment provider error (HTTP {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("unexpected payment provider response: {0}")]
    Decode(String),

    #[error("payment gateway not configured: {0}")]
    NotConfigured(String),
}

impl GatewayError {
    /// Worth another `initialize` attempt
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout | GatewayError::Transport(_) => true,
            GatewayError::Provider { status, .. } => *status >= 500 || *status == 429,
            GatewayError::Decode(_) | GatewayError::NotConfigured(_) => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::Provider {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Timeout => AppError::gateway_timeout(),
            other => AppError::gateway(other.to_string()),
        }
    }
}

/// Hosted payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Create a hosted checkout session for `params.tx_ref`
    async fn initialize(
        &self,
        params: &InitializeParams,
    ) -> Result<GatewayOutcome<CheckoutSession>, GatewayError>;

    /// Ask the provider whether `tx_ref` was paid
    async fn verify(&self, tx_ref: &str) -> Result<GatewayOutcome<VerifiedPayment>, GatewayError>;
}
