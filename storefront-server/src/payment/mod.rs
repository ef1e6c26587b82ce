//! Hosted payment: initialization, provider clients and reconciliation

pub mod chapa;
pub mod gateway;
pub mod mock;
pub mod reconciliation;
pub mod retry;
pub mod service;

pub use chapa::ChapaGateway;
pub use gateway::{GatewayError, GatewayOutcome, PaymentGateway};
pub use mock::MockGateway;
pub use retry::RetryPolicy;
pub use service::{PaymentService, PaymentSettings};
