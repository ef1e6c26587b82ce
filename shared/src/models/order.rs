//! Order Model
//!
//! The order document as persisted by the server and returned to clients.
//! Line items are a snapshot of the cart at checkout time and are never
//! re-read from the catalog; only `status`, `driver` and the payment fields
//! change after creation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Order lifecycle status
///
/// Wire names match the storefront UI labels, including the spaced
/// `"On the way"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    #[serde(rename = "On the way")]
    OnTheWay,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Position in the forward fulfillment sequence
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 1,
            Self::Preparing => 2,
            Self::OnTheWay => 3,
            Self::Delivered => 4,
            Self::Cancelled => 5,
        }
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Preparing => "Preparing",
            Self::OnTheWay => "On the way",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Preparing" => Ok(Self::Preparing),
            "On the way" => Ok(Self::OnTheWay),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Provider-side payment state recorded on the order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported payment methods (a single hosted provider)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaymentMethod {
    #[default]
    Chapa,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chapa => "Chapa",
        }
    }
}

/// Line item snapshot
///
/// Accepts the storefront cart's short keys (`product`, `price`, `qty`)
/// as aliases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product reference (String ID)
    #[serde(alias = "product")]
    #[validate(length(min = 1, message = "product reference must not be empty"))]
    pub product_ref: String,
    #[validate(length(min = 1, max = 200, message = "item name must be 1-200 characters"))]
    pub name: String,
    #[serde(default)]
    pub image: String,
    /// Price per unit in currency unit
    #[serde(alias = "price")]
    #[validate(range(min = 0.0, max = 1000000.0, message = "unit price out of range"))]
    pub unit_price: f64,
    #[serde(alias = "qty")]
    #[validate(range(min = 1, max = 9999, message = "quantity must be between 1 and 9999"))]
    pub quantity: i32,
}

/// The customer who placed the order, captured from the auth context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderOwner {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Provider correlation record
///
/// `transaction_ref` is unique across all orders and is the reconciliation key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub transaction_ref: String,
    pub status: PaymentStatus,
    /// Last change (Unix millis)
    pub update_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl PaymentResult {
    pub fn pending(transaction_ref: impl Into<String>, now: i64) -> Self {
        Self {
            transaction_ref: transaction_ref.into(),
            status: PaymentStatus::Pending,
            update_time: now,
            failure_reason: None,
        }
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub owner: OrderOwner,
    pub items: Vec<OrderItem>,
    pub shipping_address: String,
    /// Items plus delivery fee, fixed at creation
    pub total_price: f64,
    /// Delivery fee included in `total_price`
    pub delivery_fee: f64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_result: Option<PaymentResult>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Current transaction reference, if a payment was ever initialized
    pub fn transaction_ref(&self) -> Option<&str> {
        self.payment_result
            .as_ref()
            .map(|p| p.transaction_ref.as_str())
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.payment_result.as_ref().map(|p| p.status)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner.id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&OrderStatus::OnTheWay).unwrap();
        assert_eq!(json, "\"On the way\"");

        let status: OrderStatus = serde_json::from_str("\"Preparing\"").unwrap();
        assert_eq!(status, OrderStatus::Preparing);

        assert!(serde_json::from_str::<OrderStatus>("\"Shipped\"").is_err());
    }

    #[test]
    fn test_status_from_str_matches_display() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::OnTheWay,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::OnTheWay.is_terminal());
        assert!(OrderStatus::Preparing.rank() > OrderStatus::Pending.rank());
    }

    #[test]
    fn test_item_accepts_cart_aliases() {
        let json = r#"{"product":"p1","name":"Coffee","image":"/c.png","price":100,"qty":2}"#;
        let item: OrderItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.product_ref, "p1");
        assert_eq!(item.unit_price, 100.0);
        assert_eq!(item.quantity, 2);

        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["productRef"], "p1");
        assert_eq!(out["unitPrice"], 100.0);
    }

    #[test]
    fn test_item_validation() {
        let mut item = OrderItem {
            product_ref: "p1".into(),
            name: "Coffee".into(),
            image: String::new(),
            unit_price: 10.0,
            quantity: 1,
        };
        assert!(item.validate().is_ok());

        item.quantity = 0;
        assert!(item.validate().is_err());

        item.quantity = 1;
        item.unit_price = -1.0;
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_payment_status_lowercase() {
        let json = serde_json::to_string(&PaymentStatus::Success).unwrap();
        assert_eq!(json, "\"success\"");
        let pr = PaymentResult::pending("TX-1", 10);
        assert_eq!(pr.status, PaymentStatus::Pending);
        let v = serde_json::to_value(&pr).unwrap();
        assert_eq!(v["transactionRef"], "TX-1");
        assert!(v.get("failureReason").is_none());
    }
}
