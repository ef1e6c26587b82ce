//! Abandoned checkout sweeper
//!
//! Opt-in (`PENDING_ORDER_TTL_MINUTES`). Orders that are still `Pending` and
//! unpaid after the TTL are cancelled and a pending payment record is marked
//! failed. Without the setting abandoned orders are kept indefinitely.

use std::time::Duration;

use shared::error::{AppError, AppResult};
use shared::models::{OrderStatus, PaymentStatus};
use shared::util::now_millis;
use tokio_util::sync::CancellationToken;

use crate::audit_log;
use crate::store::OrderStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Cancel abandoned orders created before `now - ttl`; returns how many
pub fn sweep_abandoned_orders(store: &OrderStore, ttl: Duration, now: i64) -> AppResult<usize> {
    let cutoff = now.saturating_sub(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX));
    let candidates: Vec<String> = store
        .list(None)?
        .into_iter()
        .filter(|o| is_abandoned(o.status, o.is_paid, o.created_at, cutoff))
        .map(|o| o.id)
        .collect();

    let mut cancelled = 0;
    for order_id in candidates {
        let mut changed = false;
        // Re-checked inside the write transaction; a payment may have landed
        store.update_with(&order_id, |order| {
            if !is_abandoned(order.status, order.is_paid, order.created_at, cutoff) {
                return Ok::<(), AppError>(());
            }
            order.status = OrderStatus::Cancelled;
            order.updated_at = now;
            if let Some(payment) = order.payment_result.as_mut()
                && payment.status == PaymentStatus::Pending
            {
                payment.status = PaymentStatus::Failed;
                payment.update_time = now;
                payment.failure_reason = Some("checkout abandoned".to_string());
            }
            changed = true;
            Ok(())
        })?;

        if changed {
            cancelled += 1;
            audit_log!("system", "cancel_abandoned", format!("order:{order_id}"));
        }
    }

    Ok(cancelled)
}

fn is_abandoned(status: OrderStatus, is_paid: bool, created_at: i64, cutoff: i64) -> bool {
    status == OrderStatus::Pending && !is_paid && created_at < cutoff
}

/// Periodic loop run under `BackgroundTasks`
pub async fn run_sweeper(store: OrderStore, ttl: Duration, shutdown: CancellationToken) {
    tracing::info!(ttl_secs = ttl.as_secs(), "Abandoned order sweeper started");
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Abandoned order sweeper stopped");
                return;
            }
            _ = interval.tick() => {
                match sweep_abandoned_orders(&store, ttl, now_millis()) {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(cancelled = n, "Cancelled abandoned orders"),
                    Err(e) => tracing::error!(error = %e, "Abandoned order sweep failed"),
                }
            }
        }
    }
}
