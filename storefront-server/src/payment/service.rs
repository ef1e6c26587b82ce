//! Payment initialization and the admin payment ledger
//!
//! Verification lives in [`super::reconciliation`].

use std::sync::Arc;
use std::time::Duration;

use shared::client::{InitializePaymentResponse, PaymentTransaction};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderStatus, PaymentResult};
use shared::util::{new_transaction_ref, now_millis};

use super::gateway::{GatewayOutcome, InitializeParams, PaymentGateway};
use super::retry::{RetryPolicy, with_retries};
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::store::OrderStore;

/// Attempts at minting a reference that is not already in the index
const TX_REF_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Storefront origin, for the provider return URL
    pub frontend_url: String,
    /// Deadline for a single provider call
    pub call_timeout: Duration,
    pub init_retry: RetryPolicy,
}

#[derive(Clone)]
pub struct PaymentService {
    pub(super) store: OrderStore,
    pub(super) gateway: Arc<dyn PaymentGateway>,
    pub(super) settings: PaymentSettings,
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService")
            .field("gateway", &self.gateway.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PaymentService {
    pub fn new(store: OrderStore, gateway: Arc<dyn PaymentGateway>, settings: PaymentSettings) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    fn return_url(&self, tx_ref: &str) -> String {
        format!("{}/payment-result?tx_ref={}", self.settings.frontend_url, tx_ref)
    }

    /// Start a hosted checkout for `order_id`
    ///
    /// A fresh reference is recorded as `pending` on the order before the
    /// provider is called, so it stays verifiable whatever happens next.
    /// Provider failures leave the order Pending and unpaid.
    pub async fn initialize(
        &self,
        order_id: &str,
        user: &CurrentUser,
    ) -> AppResult<InitializePaymentResponse> {
        let order = self
            .store
            .get(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;
        if !user.is_admin() && !order.is_owned_by(&user.id) {
            return Err(AppError::permission_denied("Not your order"));
        }
        ensure_payable(&order)?;

        let (order, tx_ref) = self.attach_new_reference(order_id)?;
        audit_log!(user.id, "payment_initialize", format!("order:{order_id}"), tx_ref.as_str());

        let params = self.initialize_params(&order, &tx_ref);
        let gateway = Arc::clone(&self.gateway);
        let result = with_retries("initialize", self.settings.init_retry, || {
            let gateway = Arc::clone(&gateway);
            let params = params.clone();
            async move { gateway.initialize(&params).await }
        })
        .await;

        match result {
            Ok(GatewayOutcome::Success(session)) => {
                tracing::info!(
                    order_id = %order_id,
                    tx_ref = %tx_ref,
                    gateway = self.gateway.name(),
                    "Payment session created"
                );
                Ok(InitializePaymentResponse {
                    checkout_url: session.checkout_url,
                    tx_ref,
                })
            }
            Ok(GatewayOutcome::Failure(failure)) => {
                tracing::warn!(
                    order_id = %order_id,
                    tx_ref = %tx_ref,
                    provider_status = ?failure.status,
                    reason = %failure.message,
                    "Payment provider rejected initialization"
                );
                Err(AppError::gateway(format!(
                    "Payment initialization failed: {}",
                    failure.message
                ))
                .with_detail("tx_ref", tx_ref))
            }
            Err(e) => {
                tracing::error!(order_id = %order_id, tx_ref = %tx_ref, error = %e, "Payment initialization failed");
                Err(AppError::from(e).with_detail("tx_ref", tx_ref))
            }
        }
    }

    /// Mint a reference and record it as pending, retrying on index collisions
    fn attach_new_reference(&self, order_id: &str) -> AppResult<(Order, String)> {
        let mut last_err = None;
        for _ in 0..TX_REF_ATTEMPTS {
            let tx_ref = new_transaction_ref();
            let result = self.store.attach_transaction_ref(order_id, &tx_ref, |order| {
                // Re-checked under the write lock
                ensure_payable(order)?;
                let now = now_millis();
                order.payment_result = Some(PaymentResult::pending(tx_ref.clone(), now));
                order.updated_at = now;
                Ok::<(), AppError>(())
            });

            match result {
                Ok(order) => return Ok((order, tx_ref)),
                Err(e) if e.code == ErrorCode::TransactionRefConflict => {
                    tracing::warn!(order_id = %order_id, tx_ref = %tx_ref, "Transaction reference collision, regenerating");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| AppError::new(ErrorCode::TransactionRefConflict)))
    }

    fn initialize_params(&self, order: &Order, tx_ref: &str) -> InitializeParams {
        let (first_name, last_name) = InitializeParams::split_name(&order.owner.name);
        let return_url = self.return_url(tx_ref);
        InitializeParams {
            tx_ref: tx_ref.to_string(),
            amount: order.total_price,
            currency: order.currency.clone(),
            email: order.owner.email.clone(),
            first_name,
            last_name,
            phone_number: order.owner.phone.clone(),
            callback_url: return_url.clone(),
            return_url,
            title: "Order payment".to_string(),
            description: format!("Payment for order {}", order.id),
        }
    }

    /// One row per order that has a payment record, newest first
    pub fn list_transactions(&self) -> AppResult<Vec<PaymentTransaction>> {
        let rows = self
            .store
            .list(None)?
            .into_iter()
            .filter_map(|order| {
                let payment = order.payment_result?;
                Some(PaymentTransaction {
                    tx_ref: payment.transaction_ref,
                    order_id: order.id,
                    owner_id: order.owner.id,
                    owner_name: order.owner.name,
                    payment_method: order.payment_method,
                    amount: order.total_price,
                    currency: order.currency,
                    status: payment.status,
                    is_paid: order.is_paid,
                    paid_at: order.paid_at,
                    updated_at: payment.update_time,
                })
            })
            .collect();
        Ok(rows)
    }
}

/// Only unpaid orders that are still Pending can start a checkout
fn ensure_payable(order: &Order) -> AppResult<()> {
    if order.is_paid {
        return Err(AppError::new(ErrorCode::OrderAlreadyPaid).with_detail("order_id", order.id.as_str()));
    }
    if order.status != OrderStatus::Pending {
        return Err(AppError::with_message(
            ErrorCode::OrderNotPayable,
            format!("Order is {} and can no longer be paid", order.status),
        )
        .with_detail("order_id", order.id.as_str()));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::payment::gateway::GatewayError;
    use crate::payment::mock::{MockGateway, MockInit};
    use shared::models::{OrderItem, OrderOwner, PaymentMethod, PaymentStatus};

    pub(crate) fn settings() -> PaymentSettings {
        PaymentSettings {
            frontend_url: "http://localhost:5173".to_string(),
            call_timeout: Duration::from_millis(200),
            init_retry: RetryPolicy {
                max_retries: 2,
                attempt_timeout: Duration::from_millis(200),
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
        }
    }

    pub(crate) fn customer() -> CurrentUser {
        CurrentUser {
            id: "user-1".to_string(),
            name: "Selam Tesfaye".to_string(),
            email: Some("selam@example.com".to_string()),
            phone: Some("0911000000".to_string()),
            role: "customer".to_string(),
        }
    }

    pub(crate) fn pending_order(id: &str, owner: &CurrentUser) -> Order {
        Order {
            id: id.to_string(),
            owner: OrderOwner {
                id: owner.id.clone(),
                name: owner.name.clone(),
                email: owner.email.clone(),
                phone: owner.phone.clone(),
            },
            items: vec![OrderItem {
                product_ref: "p1".to_string(),
                name: "Coffee".to_string(),
                image: String::new(),
                unit_price: 100.0,
                quantity: 2,
            }],
            shipping_address: "Bole".to_string(),
            total_price: 205.0,
            delivery_fee: 5.0,
            currency: "ETB".to_string(),
            payment_method: PaymentMethod::Chapa,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            status: OrderStatus::Pending,
            driver: None,
            created_at: 1,
            updated_at: 1,
        }
    }

    pub(crate) fn setup() -> (PaymentService, Arc<MockGateway>) {
        let store = OrderStore::open_in_memory().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let service = PaymentService::new(store, gateway.clone(), settings());
        (service, gateway)
    }

    #[tokio::test]
    async fn test_initialize_records_pending_reference() {
        let (svc, gateway) = setup();
        let user = customer();
        svc.store.insert(&pending_order("o1", &user)).unwrap();

        let resp = svc.initialize("o1", &user).await.unwrap();
        assert!(resp.checkout_url.ends_with(&resp.tx_ref));
        assert!(resp.tx_ref.starts_with("TX-"));

        let order = svc.store.get("o1").unwrap().unwrap();
        assert_eq!(order.transaction_ref(), Some(resp.tx_ref.as_str()));
        assert_eq!(order.payment_status(), Some(PaymentStatus::Pending));

        let session = gateway.session(&resp.tx_ref).unwrap();
        assert_eq!(session.amount, 205.0);
        assert_eq!(session.first_name, "Selam");
        assert_eq!(session.last_name, "Tesfaye");
        assert_eq!(
            session.return_url,
            format!("http://localhost:5173/payment-result?tx_ref={}", resp.tx_ref)
        );
    }

    #[tokio::test]
    async fn test_initialize_gateway_error_keeps_order_pending() {
        let (svc, gateway) = setup();
        let user = customer();
        svc.store.insert(&pending_order("o1", &user)).unwrap();
        for _ in 0..3 {
            gateway.push_init(MockInit::Error(GatewayError::Transport("refused".into())));
        }

        let err = svc.initialize("o1", &user).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentGatewayError);
        assert_eq!(gateway.initialize_calls(), 3);

        let order = svc.store.get("o1").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_paid);
        assert_eq!(order.payment_status(), Some(PaymentStatus::Pending));
    }

    #[tokio::test]
    async fn test_initialize_transient_error_is_retried() {
        let (svc, gateway) = setup();
        let user = customer();
        svc.store.insert(&pending_order("o1", &user)).unwrap();
        gateway.push_init(MockInit::Error(GatewayError::Timeout));

        assert!(svc.initialize("o1", &user).await.is_ok());
        assert_eq!(gateway.initialize_calls(), 2);
    }

    #[tokio::test]
    async fn test_initialize_provider_rejection_not_retried() {
        let (svc, gateway) = setup();
        let user = customer();
        svc.store.insert(&pending_order("o1", &user)).unwrap();
        gateway.push_init(MockInit::Failure("invalid phone number".into()));

        let err = svc.initialize("o1", &user).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentGatewayError);
        assert_eq!(gateway.initialize_calls(), 1);
    }

    #[tokio::test]
    async fn test_initialize_rejects_paid_and_foreign_orders() {
        let (svc, _gateway) = setup();
        let user = customer();
        let mut paid = pending_order("paid", &user);
        paid.is_paid = true;
        paid.status = OrderStatus::Preparing;
        svc.store.insert(&paid).unwrap();
        svc.store.insert(&pending_order("o2", &user)).unwrap();

        let err = svc.initialize("paid", &user).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderAlreadyPaid);

        let stranger = CurrentUser {
            id: "user-2".to_string(),
            ..customer()
        };
        let err = svc.initialize("o2", &stranger).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let err = svc.initialize("missing", &user).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn test_reinitialize_mints_new_reference() {
        let (svc, _gateway) = setup();
        let user = customer();
        svc.store.insert(&pending_order("o1", &user)).unwrap();

        let first = svc.initialize("o1", &user).await.unwrap();
        let second = svc.initialize("o1", &user).await.unwrap();
        assert_ne!(first.tx_ref, second.tx_ref);

        // Both references still resolve to the order
        assert_eq!(svc.store.find_by_tx_ref(&first.tx_ref).unwrap().unwrap().id, "o1");
        assert_eq!(svc.store.find_by_tx_ref(&second.tx_ref).unwrap().unwrap().id, "o1");
    }

    #[tokio::test]
    async fn test_list_transactions() {
        let (svc, _gateway) = setup();
        let user = customer();
        svc.store.insert(&pending_order("o1", &user)).unwrap();
        svc.store.insert(&pending_order("o2", &user)).unwrap();
        let resp = svc.initialize("o1", &user).await.unwrap();

        let rows = svc.list_transactions().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tx_ref, resp.tx_ref);
        assert_eq!(rows[0].order_id, "o1");
        assert_eq!(rows[0].status, PaymentStatus::Pending);
        assert_eq!(rows[0].amount, 205.0);
    }
}
