//! Order API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /orders | POST | customer |
//! | /orders/myorders | GET | customer |
//! | /orders/{id} | GET | owner or admin |
//! | /orders | GET | admin |
//! | /orders/{id}/status | PUT | admin |
//! | /orders/{id}/driver | PUT | admin |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    let customer_routes = Router::new()
        .route("/orders", post(handler::create))
        .route("/orders/myorders", get(handler::my_orders))
        .route("/orders/{id}", get(handler::get_by_id));

    let admin_routes = Router::new()
        .route("/orders", get(handler::list_all))
        .route("/orders/{id}/status", put(handler::update_status))
        .route("/orders/{id}/driver", put(handler::update_driver))
        .route_layer(middleware::from_fn(require_admin));

    customer_routes.merge(admin_routes)
}
