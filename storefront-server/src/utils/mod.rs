//! Utilities - logging and input validation
//!
//! Error types live in `shared::error` and are re-exported here.

pub mod logger;
pub mod validation;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
