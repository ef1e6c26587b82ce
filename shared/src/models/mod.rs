//! Domain models shared between server and client

pub mod order;

pub use order::{
    Order, OrderItem, OrderOwner, OrderStatus, PaymentMethod, PaymentResult, PaymentStatus,
};
