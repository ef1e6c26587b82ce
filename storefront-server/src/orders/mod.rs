//! Orders
//!
//! - [`OrderService`] - checkout order creation and fulfillment updates
//! - [`money`] - Decimal totals
//! - [`status`] - status transition rules
//! - [`sweeper`] - optional abandoned checkout cleanup

pub mod money;
pub mod service;
pub mod status;
pub mod sweeper;

pub use service::OrderService;
