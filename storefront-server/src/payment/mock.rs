//! In-process payment gateway
//!
//! Used with `PAYMENT_PROVIDER=mock` for local development and by tests.
//! Every initialized reference is remembered; it verifies as paid only after
//! [`MockGateway::complete_payment`] or an explicit scripted outcome.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::gateway::{
    CheckoutSession, GatewayError, GatewayOutcome, InitializeParams, PaymentGateway,
    ProviderFailure, VerifiedPayment,
};

/// Scripted result for the next `initialize` call
#[derive(Debug, Clone)]
pub enum MockInit {
    Failure(String),
    Error(GatewayError),
}

/// Scripted result for `verify` of one reference
#[derive(Debug, Clone)]
pub enum MockVerify {
    Paid { amount: f64, currency: String },
    Failure(String),
    Error(GatewayError),
}

#[derive(Debug, Default)]
struct MockState {
    init_script: VecDeque<MockInit>,
    sessions: HashMap<String, InitializeParams>,
    verify_script: HashMap<String, MockVerify>,
    init_delay: Option<Duration>,
    verify_delay: Option<Duration>,
}

#[derive(Debug)]
pub struct MockGateway {
    checkout_base: String,
    state: Mutex<MockState>,
    init_calls: AtomicU32,
    verify_calls: AtomicU32,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new("https://checkout.mock.local/pay")
    }
}

impl MockGateway {
    pub fn new(checkout_base: impl Into<String>) -> Self {
        Self {
            checkout_base: checkout_base.into(),
            state: Mutex::new(MockState::default()),
            init_calls: AtomicU32::new(0),
            verify_calls: AtomicU32::new(0),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        // Test double; a poisoned lock still holds usable state
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue an outcome for the next `initialize` call
    pub fn push_init(&self, outcome: MockInit) {
        self.state().init_script.push_back(outcome);
    }

    /// Simulate the customer paying the session for `tx_ref` in full
    pub fn complete_payment(&self, tx_ref: &str) -> bool {
        let mut state = self.state();
        let Some(params) = state.sessions.get(tx_ref).cloned() else {
            return false;
        };
        state.verify_script.insert(
            tx_ref.to_string(),
            MockVerify::Paid {
                amount: params.amount,
                currency: params.currency,
            },
        );
        true
    }

    pub fn set_verify(&self, tx_ref: &str, outcome: MockVerify) {
        self.state().verify_script.insert(tx_ref.to_string(), outcome);
    }

    pub fn set_init_delay(&self, delay: Duration) {
        self.state().init_delay = Some(delay);
    }

    pub fn set_verify_delay(&self, delay: Duration) {
        self.state().verify_delay = Some(delay);
    }

    pub fn initialize_calls(&self) -> u32 {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> u32 {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Parameters the last successful `initialize` for `tx_ref` received
    pub fn session(&self, tx_ref: &str) -> Option<InitializeParams> {
        self.state().sessions.get(tx_ref).cloned()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn initialize(
        &self,
        params: &InitializeParams,
    ) -> Result<GatewayOutcome<CheckoutSession>, GatewayError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let (scripted, delay) = {
            let mut state = self.state();
            (state.init_script.pop_front(), state.init_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match scripted {
            Some(MockInit::Failure(message)) => {
                Ok(GatewayOutcome::Failure(ProviderFailure::with_status("failed", message)))
            }
            Some(MockInit::Error(err)) => Err(err),
            None => {
                self.state()
                    .sessions
                    .insert(params.tx_ref.clone(), params.clone());
                Ok(GatewayOutcome::Success(CheckoutSession {
                    checkout_url: format!("{}/{}", self.checkout_base, params.tx_ref),
                }))
            }
        }
    }

    async fn verify(&self, tx_ref: &str) -> Result<GatewayOutcome<VerifiedPayment>, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let (scripted, known, delay) = {
            let state = self.state();
            (
                state.verify_script.get(tx_ref).cloned(),
                state.sessions.contains_key(tx_ref),
                state.verify_delay,
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match scripted {
            Some(MockVerify::Paid { amount, currency }) => {
                Ok(GatewayOutcome::Success(VerifiedPayment {
                    tx_ref: tx_ref.to_string(),
                    amount,
                    currency,
                }))
            }
            Some(MockVerify::Failure(message)) => {
                Ok(GatewayOutcome::Failure(ProviderFailure::with_status("failed", message)))
            }
            Some(MockVerify::Error(err)) => Err(err),
            None if known => Ok(GatewayOutcome::Failure(ProviderFailure::with_status(
                "pending",
                "Payment not completed",
            ))),
            None => Ok(GatewayOutcome::Failure(ProviderFailure::with_status(
                "failed",
                "Invalid transaction or Transaction not found",
            ))),
        }
    }
}
