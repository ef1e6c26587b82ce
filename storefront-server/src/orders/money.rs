//! Money calculation utilities using rust_decimal for precision
//!
//! Totals are computed in `Decimal` and stored as `f64` rounded to 2 places.

use rust_decimal::prelude::*;
use shared::error::AppError;
use shared::models::OrderItem;

const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 9999;

#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate numeric fields of a line item before pricing
pub fn validate_item_amounts(item: &OrderItem) -> Result<(), AppError> {
    require_finite(item.unit_price, "price")?;
    if item.unit_price < 0.0 {
        return Err(AppError::validation(format!(
            "price must be non-negative, got {}",
            item.unit_price
        )));
    }
    if item.unit_price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "price exceeds maximum allowed value of {}",
            MAX_PRICE
        )));
    }
    if item.quantity <= 0 || item.quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity must be between 1 and {}, got {}",
            MAX_QUANTITY, item.quantity
        )));
    }
    Ok(())
}

#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert back to f64, rounded half away from zero to 2 places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// sum(unitPrice × quantity)
pub fn items_subtotal(items: &[OrderItem]) -> Decimal {
    items
        .iter()
        .map(|item| to_decimal(item.unit_price) * Decimal::from(item.quantity))
        .sum()
}

/// Items subtotal plus the fixed delivery fee
pub fn order_total(items: &[OrderItem], delivery_fee: Decimal) -> Decimal {
    items_subtotal(items) + delivery_fee
}

/// Equal within 0.01
pub fn money_eq(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}
