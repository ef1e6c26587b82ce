//! Fulfillment status transitions
//!
//! | From | Allowed targets |
//! |------|-----------------|
//! | Pending | any (Pending only before a payment exists) |
//! | Confirmed / Preparing / On the way | same or later, or Cancelled |
//! | Delivered / Cancelled | same only |

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderStatus};

/// Check whether `order` may move to `next`
pub fn check_transition(order: &Order, next: OrderStatus) -> Result<(), AppError> {
    let current = order.status;
    if current == next {
        return Ok(());
    }

    if next == OrderStatus::Pending && order.payment_result.is_some() {
        return Err(reject(
            current,
            next,
            "cannot return to Pending once a payment exists",
        ));
    }

    if current.is_terminal() {
        return Err(reject(current, next, "order is already closed"));
    }

    if next == OrderStatus::Cancelled || next.rank() > current.rank() {
        return Ok(());
    }

    Err(reject(current, next, "status can only move forward"))
}

fn reject(current: OrderStatus, next: OrderStatus, reason: &str) -> AppError {
    AppError::with_message(
        ErrorCode::InvalidStatusTransition,
        format!("Cannot change status from {current} to {next}: {reason}"),
    )
    .with_detail("from", current.as_str())
    .with_detail("to", next.as_str())
}
