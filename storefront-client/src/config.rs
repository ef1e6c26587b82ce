//! Client configuration

use std::sync::Arc;

use crate::{ClientResult, HttpClient, SessionCache};

/// Where and how to reach the storefront server
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g. "http://localhost:5000")
    pub base_url: String,

    /// Bearer token of the logged-in user
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// HTTP client sharing the process-wide session cache
    pub fn build_http_client(&self) -> ClientResult<HttpClient> {
        HttpClient::new(self, SessionCache::global())
    }

    /// HTTP client with its own session cache (tests, multi-tenant tools)
    pub fn build_http_client_with_sessions(&self, sessions: Arc<SessionCache>) -> ClientResult<HttpClient> {
        HttpClient::new(self, sessions)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:5000")
    }
}
