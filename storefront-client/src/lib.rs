//! Storefront client - checkout orchestration against the storefront server
//!
//! - [`HttpClient`] / [`StorefrontApi`] - typed API calls
//! - [`SessionCache`] - process-wide token → user cache
//! - [`cart::Cart`] - local cart and totals
//! - [`checkout::CheckoutOrchestrator`] - order + payment initialization
//! - [`payment_result::PaymentResultPage`] - return page state machine

pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod http;
pub mod payment_result;
pub mod session;

pub use cart::{Cart, CartItem};
pub use checkout::{CheckoutError, CheckoutOrchestrator, CheckoutRedirect};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, StorefrontApi};
pub use payment_result::{PaymentResultPage, PaymentView};
pub use session::SessionCache;

// Re-export shared types for convenience
pub use shared::client::{InitializePaymentResponse, UserInfo, VerifyPaymentResponse};
