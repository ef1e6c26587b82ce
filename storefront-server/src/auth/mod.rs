//! Authentication
//!
//! - [`JwtService`] - token validation
//! - [`CurrentUser`] - authenticated caller
//! - [`require_auth`] / [`require_admin`] - route guards

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService, TokenSubject};
pub use middleware::{require_admin, require_auth};
