//! Return page after the hosted checkout
//!
//! ```text
//! Verifying ──verify: success──▶ Success (cart cleared)
//!     │
//!     └──verify: failed / error / no tx_ref──▶ Failed (cart kept, retry via /cart)
//! ```
//!
//! Verification runs exactly once per page; reloading the page creates a new
//! [`PaymentResultPage`] and verifies again.

use reqwest::Url;

use crate::StorefrontApi;
use crate::cart::Cart;
use shared::models::{Order, PaymentStatus};

/// Where the failed view sends the customer
pub const RETRY_PATH: &str = "/cart";

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentView {
    Verifying,
    Success { order: Option<Order> },
    Failed { message: String },
}

#[derive(Debug)]
pub struct PaymentResultPage {
    tx_ref: Option<String>,
    view: PaymentView,
    verify_started: bool,
}

/// `tx_ref` query parameter of a return URL, absolute or relative
pub fn tx_ref_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(url)))
        .ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "tx_ref")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl PaymentResultPage {
    pub fn new(tx_ref: Option<String>) -> Self {
        let view = match tx_ref {
            Some(_) => PaymentView::Verifying,
            None => PaymentView::Failed {
                message: "Transaction reference missing.".to_string(),
            },
        };
        Self {
            tx_ref,
            view,
            verify_started: false,
        }
    }

    pub fn from_return_url(url: &str) -> Self {
        Self::new(tx_ref_from_url(url))
    }

    pub fn tx_ref(&self) -> Option<&str> {
        self.tx_ref.as_deref()
    }

    pub fn view(&self) -> &PaymentView {
        &self.view
    }

    /// Path for the "try again" action, only offered on failure
    pub fn retry_path(&self) -> Option<&'static str> {
        matches!(self.view, PaymentView::Failed { .. }).then_some(RETRY_PATH)
    }

    /// Verify the reference; later calls return the settled view untouched
    pub async fn on_mount<A>(&mut self, api: &A, cart: &mut Cart) -> &PaymentView
    where
        A: StorefrontApi + ?Sized,
    {
        if self.verify_started {
            return &self.view;
        }
        self.verify_started = true;

        let Some(tx_ref) = self.tx_ref.clone() else {
            return &self.view;
        };

        self.view = match api.verify_payment(&tx_ref).await {
            Ok(resp) if resp.status == PaymentStatus::Success => {
                cart.clear();
                tracing::info!(tx_ref = %tx_ref, "Payment confirmed");
                PaymentView::Success { order: resp.order }
            }
            Ok(resp) => PaymentView::Failed {
                message: resp
                    .message
                    .unwrap_or_else(|| "Payment status not success.".to_string()),
            },
            Err(e) => {
                tracing::warn!(tx_ref = %tx_ref, error = %e, "Payment verification request failed");
                PaymentView::Failed {
                    message: e.user_message(),
                }
            }
        };
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_ref_from_absolute_and_relative_urls() {
        assert_eq!(
            tx_ref_from_url("http://localhost:5173/payment-result?tx_ref=TX-abc"),
            Some("TX-abc".to_string())
        );
        assert_eq!(
            tx_ref_from_url("/payment-result?status=success&tx_ref=TX-def"),
            Some("TX-def".to_string())
        );
        assert_eq!(tx_ref_from_url("/payment-result"), None);
        assert_eq!(tx_ref_from_url("/payment-result?tx_ref="), None);
    }

    #[test]
    fn test_missing_reference_fails_immediately() {
        let page = PaymentResultPage::from_return_url("/payment-result");
        assert!(matches!(page.view(), PaymentView::Failed { message } if message.contains("missing")));
        assert_eq!(page.retry_path(), Some(RETRY_PATH));
    }

    #[test]
    fn test_starts_verifying() {
        let page = PaymentResultPage::new(Some("TX-1".to_string()));
        assert_eq!(page.view(), &PaymentView::Verifying);
        assert_eq!(page.retry_path(), None);
    }
}
