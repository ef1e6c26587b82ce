//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;
use shared::client::{CreateOrderRequest, UpdateDriverRequest, UpdateStatusRequest};
use shared::models::Order;

/// POST /orders - place an order from the cart
pub async fn create(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = state.orders.create_order(current_user.as_owner(), payload)?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/myorders - caller's orders, newest first
pub async fn my_orders(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state.orders.list_orders(Some(&current_user.id))?;
    Ok(Json(orders))
}

/// GET /orders - every order
pub async fn list_all(State(state): State<ServerState>) -> AppResult<Json<Vec<Order>>> {
    let orders = state.orders.list_orders(None)?;
    Ok(Json(orders))
}

/// GET /orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.orders.get_order_for(&id, &current_user)?;
    Ok(Json(order))
}

/// PUT /orders/{id}/status
pub async fn update_status(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Order>> {
    let order = state
        .orders
        .update_status(&id, payload.status, &current_user)?;
    Ok(Json(order))
}

/// PUT /orders/{id}/driver
pub async fn update_driver(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateDriverRequest>,
) -> AppResult<Json<Order>> {
    let order = state
        .orders
        .update_driver(&id, &payload.driver, &current_user)?;
    Ok(Json(order))
}
