//! Request/response types shared between storefront-server and storefront-client

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ErrorCode;
use crate::models::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus};

// =============================================================================
// Order API DTOs
// =============================================================================

/// `POST /orders` body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(nested)]
    pub order_items: Vec<OrderItem>,
    pub shipping_address: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Client-side total; checked against the server computation when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
}

/// `PUT /orders/{id}/status` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// `PUT /orders/{id}/driver` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDriverRequest {
    pub driver: String,
}

// =============================================================================
// Payment API DTOs
// =============================================================================

/// `POST /payment/initialize` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    pub order_id: String,
}

/// `POST /payment/initialize` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializePaymentResponse {
    pub checkout_url: String,
    pub tx_ref: String,
}

/// `GET /payment/verify/{tx_ref}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Why a payment is `failed`: `PaymentFailed` or `PaymentAmountMismatch`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

/// One row of the admin payment ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentTransaction {
    pub tx_ref: String,
    pub order_id: String,
    pub owner_id: String,
    pub owner_name: String,
    pub payment_method: PaymentMethod,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    pub updated_at: i64,
}

// =============================================================================
// Auth DTOs
// =============================================================================

/// Logged-in user as seen by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: String,
}

impl UserInfo {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
