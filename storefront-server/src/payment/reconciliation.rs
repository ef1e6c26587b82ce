//! Payment reconciliation
//!
//! Applies the provider's verdict for a transaction reference to the order
//! it belongs to.
//!
//! ```text
//! pending ──verify: paid, amount ok──▶ success   (isPaid, paidAt, Pending → Preparing)
//!    │  ▲
//!    │  └──verify: paid──┐
//!    ▼                   │
//! failed ────────────────┘   (provider said no, or the call errored)
//! ```
//!
//! `success` is final: verifying it again returns the stored order without
//! calling the provider.

use shared::client::VerifyPaymentResponse;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderStatus, PaymentResult, PaymentStatus};
use shared::util::{is_valid_transaction_ref, now_millis};

use super::gateway::{GatewayError, GatewayOutcome, VerifiedPayment};
use super::service::PaymentService;
use crate::orders::money::money_eq;
use crate::{audit_log, security_log};

/// What to do before asking the provider
#[derive(Debug, PartialEq)]
enum Precheck {
    /// Already settled through this reference
    AlreadyPaid,
    /// Settled through a different reference
    Superseded,
    AskProvider,
}

fn precheck(order: &Order, tx_ref: &str) -> Precheck {
    if !order.is_paid {
        return Precheck::AskProvider;
    }
    match order.payment_result.as_ref() {
        Some(p) if p.transaction_ref == tx_ref && p.status == PaymentStatus::Success => {
            Precheck::AlreadyPaid
        }
        _ => Precheck::Superseded,
    }
}

/// Provider-reported amount and currency agree with the stored order
fn amount_matches(order: &Order, paid: &VerifiedPayment) -> bool {
    money_eq(paid.amount, order.total_price) && paid.currency.eq_ignore_ascii_case(&order.currency)
}

/// Error returned when the provider gave no answer
///
/// A failed bookkeeping write is logged; the caller still sees the gateway error.
fn gateway_failure(
    order_id: &str,
    tx_ref: &str,
    err: GatewayError,
    recorded: AppResult<Order>,
) -> AppError {
    if let Err(write_err) = recorded {
        tracing::error!(
            order_id = %order_id,
            tx_ref = %tx_ref,
            error = %write_err,
            "Failed to record payment failure"
        );
    }
    AppError::from(err).with_detail("tx_ref", tx_ref)
}

fn success(order: Order) -> VerifyPaymentResponse {
    VerifyPaymentResponse {
        status: PaymentStatus::Success,
        order: Some(order),
        message: None,
        code: None,
    }
}

fn failed(order: Order, code: ErrorCode, message: impl Into<String>) -> VerifyPaymentResponse {
    VerifyPaymentResponse {
        status: PaymentStatus::Failed,
        order: Some(order),
        message: Some(message.into()),
        code: Some(code),
    }
}

impl PaymentService {
    /// Reconcile `tx_ref` against the provider
    ///
    /// - unknown reference: `PaymentNotFound`, nothing changes, provider not called
    /// - already paid through it: the stored success, provider not called
    /// - provider confirms with matching amount: order marked paid
    /// - provider says no, or amounts differ: payment record marked failed
    /// - provider unreachable: payment record marked failed, gateway error returned
    pub async fn verify(&self, tx_ref: &str) -> AppResult<VerifyPaymentResponse> {
        if !is_valid_transaction_ref(tx_ref) {
            return Err(AppError::payment_not_found(tx_ref));
        }
        let order = self
            .store
            .find_by_tx_ref(tx_ref)?
            .ok_or_else(|| AppError::payment_not_found(tx_ref))?;

        match precheck(&order, tx_ref) {
            Precheck::AlreadyPaid => {
                tracing::debug!(order_id = %order.id, tx_ref = %tx_ref, "Payment already verified");
                return Ok(success(order));
            }
            Precheck::Superseded => {
                tracing::info!(order_id = %order.id, tx_ref = %tx_ref, "Order was paid through another reference");
                return Ok(failed(
                    order,
                    ErrorCode::OrderAlreadyPaid,
                    "Order was paid through a different transaction",
                ));
            }
            Precheck::AskProvider => {}
        }

        let outcome = match tokio::time::timeout(self.settings.call_timeout, self.gateway.verify(tx_ref)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        };

        match outcome {
            Ok(GatewayOutcome::Success(paid)) if amount_matches(&order, &paid) => {
                self.mark_paid(&order.id, tx_ref)
            }
            Ok(GatewayOutcome::Success(paid)) => {
                security_log!(
                    ERROR,
                    "payment_amount_mismatch",
                    order_id = %order.id,
                    tx_ref = %tx_ref,
                    expected_amount = order.total_price,
                    expected_currency = %order.currency,
                    reported_amount = paid.amount,
                    reported_currency = %paid.currency
                );
                let reason = "Paid amount does not match the order total";
                let order = self.mark_failed(&order.id, tx_ref, reason)?;
                Ok(failed(order, ErrorCode::PaymentAmountMismatch, reason))
            }
            Ok(GatewayOutcome::Failure(failure)) => {
                tracing::info!(
                    order_id = %order.id,
                    tx_ref = %tx_ref,
                    provider_status = ?failure.status,
                    reason = %failure.message,
                    "Payment not confirmed by provider"
                );
                let order = self.mark_failed(&order.id, tx_ref, &failure.message)?;
                Ok(failed(order, ErrorCode::PaymentFailed, failure.message))
            }
            Err(e) => {
                tracing::error!(order_id = %order.id, tx_ref = %tx_ref, error = %e, "Payment verification failed");
                let recorded = self.mark_failed(&order.id, tx_ref, &e.to_string());
                Err(gateway_failure(&order.id, tx_ref, e, recorded))
            }
        }
    }

    /// Apply a confirmed payment; re-applying it is a no-op
    fn mark_paid(&self, order_id: &str, tx_ref: &str) -> AppResult<VerifyPaymentResponse> {
        let mut applied = false;
        let mut superseded = false;
        let order = self.store.update_with(order_id, |order| {
            match precheck(order, tx_ref) {
                Precheck::AlreadyPaid => return Ok::<(), AppError>(()),
                Precheck::Superseded => {
                    superseded = true;
                    return Ok(());
                }
                Precheck::AskProvider => {}
            }

            let now = now_millis();
            order.is_paid = true;
            order.paid_at = Some(now);
            order.payment_result = Some(PaymentResult {
                transaction_ref: tx_ref.to_string(),
                status: PaymentStatus::Success,
                update_time: now,
                failure_reason: None,
            });
            if order.status == OrderStatus::Pending {
                order.status = OrderStatus::Preparing;
            }
            order.updated_at = now;
            applied = true;
            Ok(())
        })?;

        if superseded {
            return Ok(failed(
                order,
                ErrorCode::OrderAlreadyPaid,
                "Order was paid through a different transaction",
            ));
        }
        if applied {
            tracing::info!(order_id = %order_id, tx_ref = %tx_ref, status = %order.status, "Payment verified");
            audit_log!("system", "payment_verified", format!("order:{order_id}"), tx_ref);
            if order.status == OrderStatus::Cancelled {
                tracing::warn!(order_id = %order_id, tx_ref = %tx_ref, "Payment received for a cancelled order");
            }
        }
        Ok(success(order))
    }

    /// Record a failed attempt on the current reference; never touches paid
    /// orders or a newer reference
    fn mark_failed(&self, order_id: &str, tx_ref: &str, reason: &str) -> AppResult<Order> {
        let mut applied = false;
        let order = self.store.update_with(order_id, |order| {
            if order.is_paid {
                return Ok::<(), AppError>(());
            }
            if let Some(payment) = order.payment_result.as_mut()
                && payment.transaction_ref == tx_ref
                && payment.status != PaymentStatus::Failed
            {
                let now = now_millis();
                payment.status = PaymentStatus::Failed;
                payment.update_time = now;
                payment.failure_reason = Some(reason.to_string());
                order.updated_at = now;
                applied = true;
            }
            Ok(())
        })?;

        if applied {
            audit_log!("system", "payment_failed", format!("order:{order_id}"), tx_ref);
        }
        Ok(order)
    }
}
