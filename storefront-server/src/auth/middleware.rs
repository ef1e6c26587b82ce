//! Authentication middleware
//!
//! Route-level guards applied with `middleware::from_fn_with_state` /
//! `middleware::from_fn`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::CurrentUser;
use crate::auth::extractor::authenticate;
use crate::core::ServerState;
use crate::security_log;
use crate::utils::{AppError, ErrorCode};

/// Whether `path` needs a bearer token
///
/// Only `/orders` and `/payment` are protected; payment verification is
/// called by the provider redirect as well as the client and stays public.
pub fn is_protected_route(path: &str) -> bool {
    let protected = path == "/orders"
        || path.starts_with("/orders/")
        || path == "/payment"
        || path.starts_with("/payment/");
    protected && !path.starts_with("/payment/verify/")
}

/// Require a valid bearer token on protected routes
///
/// On success the [`CurrentUser`] is inserted into the request extensions.
///
/// | Failure | Status |
/// |---------|--------|
/// | No Authorization header | 401 NotAuthenticated |
/// | Expired token | 401 TokenExpired |
/// | Bad token | 401 TokenInvalid |
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS || !is_protected_route(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let user = authenticate(req.headers(), req.uri().path(), state.jwt_service())?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Require `role == "admin"`; must run after [`require_auth`]
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::not_authenticated)?;

    if !user.is_admin() {
        security_log!(
            WARN,
            "admin_required",
            user_id = %user.id,
            user_role = %user.role,
            path = %req.uri().path()
        );
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_routes() {
        assert!(is_protected_route("/orders"));
        assert!(is_protected_route("/orders/myorders"));
        assert!(is_protected_route("/payment/initialize"));
        assert!(is_protected_route("/payment/transactions"));

        assert!(!is_protected_route("/payment/verify/TX-abc"));
        assert!(!is_protected_route("/health"));
        assert!(!is_protected_route("/ordersx"));
    }
}
