//! Payment API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /payment/initialize | POST | order owner |
//! | /payment/verify/{tx_ref} | GET | public |
//! | /payment/transactions | GET | admin |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    let admin_routes = Router::new()
        .route("/payment/transactions", get(handler::transactions))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/payment/initialize", post(handler::initialize))
        .route("/payment/verify/{tx_ref}", get(handler::verify))
        .merge(admin_routes)
}
