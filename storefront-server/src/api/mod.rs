//! HTTP routes
//!
//! - [`health`] - liveness
//! - [`orders`] - checkout and order management
//! - [`payment`] - hosted payment and reconciliation

pub mod health;
pub mod orders;
pub mod payment;
