//! Local shopping cart
//!
//! Lives on the client only; serialized as JSON for local persistence.
//! Totals use decimal arithmetic and the server's rounding. They are shown to
//! the customer only; the server computes the charged total itself.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use shared::models::OrderItem;

/// Default delivery fee shown before the server's order comes back
pub const DELIVERY_FEE: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
    #[serde(skip, default = "default_delivery_fee")]
    delivery_fee: Decimal,
}

fn default_delivery_fee() -> Decimal {
    DELIVERY_FEE
}

impl Default for Cart {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            delivery_fee: DELIVERY_FEE,
        }
    }
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the fee the storefront is configured with
    pub fn with_delivery_fee(mut self, fee: Decimal) -> Self {
        self.delivery_fee = fee;
        self
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Add `quantity` of an item, merging with an existing line
    pub fn add(&mut self, item: CartItem) {
        if item.quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => self.items.push(item),
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product_id != product_id);
    }

    /// Change a line's quantity by `delta`, never below one
    pub fn update_quantity(&mut self, product_id: &str, delta: i32) {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            let next = i64::from(item.quantity) + i64::from(delta);
            item.quantity = next.clamp(1, i64::from(u32::MAX)) as u32;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(|i| Decimal::from_f64(i.price).unwrap_or_default() * Decimal::from(i.quantity))
            .sum()
    }

    pub fn delivery_fee(&self) -> Decimal {
        if self.is_empty() {
            Decimal::ZERO
        } else {
            self.delivery_fee
        }
    }

    pub fn total(&self) -> Decimal {
        self.subtotal() + self.delivery_fee()
    }

    /// Display total, rounded half away from zero like the server
    pub fn total_f64(&self) -> f64 {
        self.total()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or_default()
    }

    /// Line items snapshot for `POST /orders`
    pub fn to_order_items(&self) -> Vec<OrderItem> {
        self.items
            .iter()
            .map(|i| OrderItem {
                product_ref: i.product_id.clone(),
                name: i.name.clone(),
                image: i.image.clone(),
                unit_price: i.price,
                quantity: i32::try_from(i.quantity).unwrap_or(i32::MAX),
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Restore a persisted cart; unreadable data yields an empty cart
    pub fn from_json(json: &str) -> Self {
        serde_json::from_str(json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable saved cart");
            Self::default()
        })
    }
}
