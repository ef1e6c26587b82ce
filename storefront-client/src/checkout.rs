//! Checkout orchestration
//!
//! cart → `POST /orders` → `POST /payment/initialize` → redirect to the
//! provider's hosted checkout. The cart is never cleared here; only a
//! verified payment clears it (see [`crate::payment_result`]).

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::cart::Cart;
use crate::{ClientError, StorefrontApi};
use shared::client::CreateOrderRequest;
use shared::models::PaymentMethod;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please log in to check out")]
    NotLoggedIn,

    #[error("Please enter a delivery address")]
    MissingAddress,

    #[error("Checkout is already in progress")]
    InProgress,

    #[error("Payment initialization failed")]
    NoCheckoutUrl { order_id: String },

    #[error("Checkout failed: {0}")]
    Api(#[from] ClientError),
}

impl CheckoutError {
    /// Local validation problem, nothing was sent
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CheckoutError::EmptyCart | CheckoutError::NotLoggedIn | CheckoutError::MissingAddress
        )
    }
}

/// Where to send the browser
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRedirect {
    pub order_id: String,
    pub tx_ref: String,
    pub checkout_url: String,
}

/// Drives one checkout at a time
///
/// While a submission is in flight further submissions fail with
/// [`CheckoutError::InProgress`]. After a successful submission the flag
/// stays set because the page is navigating away; call [`reset`] if the
/// navigation is cancelled.
///
/// [`reset`]: CheckoutOrchestrator::reset
pub struct CheckoutOrchestrator<A> {
    api: A,
    processing: AtomicBool,
}

impl<A: StorefrontApi> CheckoutOrchestrator<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            processing: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.processing.store(false, Ordering::SeqCst);
    }

    /// Place the order and open a hosted payment session
    pub async fn checkout(&self, cart: &Cart, address: &str) -> Result<CheckoutRedirect, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if self.api.current_user().is_none() {
            return Err(CheckoutError::NotLoggedIn);
        }
        let address = address.trim();
        if address.is_empty() {
            return Err(CheckoutError::MissingAddress);
        }
        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CheckoutError::InProgress);
        }

        let result = self.submit(cart, address).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Checkout failed");
            self.reset();
        }
        result
    }

    async fn submit(&self, cart: &Cart, address: &str) -> Result<CheckoutRedirect, CheckoutError> {
        let req = CreateOrderRequest {
            order_items: cart.to_order_items(),
            shipping_address: address.to_string(),
            payment_method: PaymentMethod::Chapa,
            // Charged total is computed server-side from the items
            total_price: None,
        };
        let order = self.api.create_order(&req).await?;
        tracing::info!(order_id = %order.id, total = order.total_price, "Order placed");

        let payment = self.api.initialize_payment(&order.id).await?;
        if payment.checkout_url.trim().is_empty() {
            return Err(CheckoutError::NoCheckoutUrl { order_id: order.id });
        }

        Ok(CheckoutRedirect {
            order_id: order.id,
            tx_ref: payment.tx_ref,
            checkout_url: payment.checkout_url,
        })
    }
}
