//! Health check
//!
//! `GET /health` is public and reports whether the order database answers.
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "gateway": "chapa", "orders": 42 }
//! ```

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// ok | error
    status: &'static str,
    version: &'static str,
    gateway: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    orders: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn health(State(state): State<ServerState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, orders, error) = match state.store.count() {
        Ok(n) => (StatusCode::OK, "ok", Some(n), None),
        Err(e) => {
            tracing::error!(error = %e, "Health check: order store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "error", None, Some(e.to_string()))
        }
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            gateway: state.payments.gateway_name(),
            orders,
            error,
        }),
    )
}
