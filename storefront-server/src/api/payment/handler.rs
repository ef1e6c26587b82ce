//! Payment API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;
use shared::client::{
    InitializePaymentRequest, InitializePaymentResponse, PaymentTransaction, VerifyPaymentResponse,
};

/// POST /payment/initialize - open a hosted checkout for an order
pub async fn initialize(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(payload): Json<InitializePaymentRequest>,
) -> AppResult<Json<InitializePaymentResponse>> {
    let resp = state
        .payments
        .initialize(&payload.order_id, &current_user)
        .await?;
    Ok(Json(resp))
}

/// GET /payment/verify/{tx_ref} - reconcile a reference with the provider
///
/// A declined payment is a 200 with `status: "failed"`.
pub async fn verify(
    State(state): State<ServerState>,
    Path(tx_ref): Path<String>,
) -> AppResult<Json<VerifyPaymentResponse>> {
    let resp = state.payments.verify(&tx_ref).await?;
    Ok(Json(resp))
}

/// GET /payment/transactions - payment ledger
pub async fn transactions(
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<PaymentTransaction>>> {
    let rows = state.payments.list_transactions()?;
    Ok(Json(rows))
}
