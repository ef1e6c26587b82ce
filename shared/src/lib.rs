//! Shared types for the storefront
//!
//! Domain models, request/response DTOs, the unified error system and
//! small utilities used by both `storefront-server` and `storefront-client`.

pub mod client;
pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
