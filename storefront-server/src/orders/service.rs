//! Order Service
//!
//! Creates orders from a submitted cart snapshot and applies fulfillment
//! updates (status, driver). Payment fields are owned by the payment module.

use rust_decimal::Decimal;
use shared::client::CreateOrderRequest;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderOwner, OrderStatus};
use shared::util::{new_order_id, now_millis};

use super::money::{self, to_f64};
use super::status::check_transition;
use crate::audit_log;
use crate::auth::CurrentUser;
use crate::store::OrderStore;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_ORDER_ITEMS, validate_dto, validate_required_text,
};

#[derive(Debug, Clone)]
pub struct OrderService {
    store: OrderStore,
    delivery_fee: Decimal,
    currency: String,
}

impl OrderService {
    pub fn new(store: OrderStore, delivery_fee: Decimal, currency: impl Into<String>) -> Self {
        Self {
            store,
            delivery_fee,
            currency: currency.into(),
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    /// Persist a new order: status Pending, unpaid, no payment record
    ///
    /// The total is computed here as sum(unitPrice × quantity) plus the
    /// delivery fee. A client-sent `totalPrice` must agree within 0.01.
    pub fn create_order(&self, owner: OrderOwner, req: CreateOrderRequest) -> AppResult<Order> {
        if req.order_items.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }
        if req.order_items.len() > MAX_ORDER_ITEMS {
            return Err(AppError::validation(format!(
                "too many items ({}, max {MAX_ORDER_ITEMS})",
                req.order_items.len()
            )));
        }
        validate_required_text(&req.shipping_address, "shippingAddress", MAX_ADDRESS_LEN)?;
        validate_dto(&req)?;
        for item in &req.order_items {
            money::validate_item_amounts(item)?;
        }

        let total = money::order_total(&req.order_items, self.delivery_fee);
        let total_price = to_f64(total);
        if let Some(client_total) = req.total_price
            && !money::money_eq(client_total, total_price)
        {
            return Err(AppError::with_message(
                ErrorCode::OrderTotalMismatch,
                format!("Order total {client_total} does not match computed total {total_price}"),
            )
            .with_detail("expected", total_price)
            .with_detail("received", client_total));
        }

        let now = now_millis();
        let order = Order {
            id: new_order_id(),
            owner,
            items: req.order_items,
            shipping_address: req.shipping_address.trim().to_string(),
            total_price,
            delivery_fee: to_f64(self.delivery_fee),
            currency: self.currency.clone(),
            payment_method: req.payment_method,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            status: OrderStatus::Pending,
            driver: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&order)?;

        tracing::info!(
            order_id = %order.id,
            owner_id = %order.owner.id,
            items = order.items.len(),
            total = order.total_price,
            "Order created"
        );
        audit_log!(order.owner.id, "create_order", format!("order:{}", order.id));

        Ok(order)
    }

    /// Newest first; scoped to `owner_id` when given
    pub fn list_orders(&self, owner_id: Option<&str>) -> AppResult<Vec<Order>> {
        Ok(self.store.list(owner_id)?)
    }

    pub fn get_order(&self, order_id: &str) -> AppResult<Order> {
        self.store
            .get(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))
    }

    /// Read an order on behalf of `user`: owners see their own, admins see all
    pub fn get_order_for(&self, order_id: &str, user: &CurrentUser) -> AppResult<Order> {
        let order = self.get_order(order_id)?;
        if !user.is_admin() && !order.is_owned_by(&user.id) {
            return Err(AppError::permission_denied("Not your order"));
        }
        Ok(order)
    }

    /// Administrative status change
    pub fn update_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        actor: &CurrentUser,
    ) -> AppResult<Order> {
        let mut previous = None;
        let order = self.store.update_with(order_id, |order| {
            check_transition(order, status)?;
            previous = Some(order.status);
            if order.status != status {
                order.status = status;
                order.updated_at = now_millis();
            }
            Ok::<(), AppError>(())
        })?;

        if let Some(from) = previous
            && from != status
        {
            tracing::info!(order_id = %order_id, from = %from, to = %status, "Order status changed");
            audit_log!(
                actor.id,
                "update_status",
                format!("order:{order_id}"),
                format!("{from} -> {status}")
            );
        }
        Ok(order)
    }

    /// Assign a fulfillment driver
    pub fn update_driver(&self, order_id: &str, driver: &str, actor: &CurrentUser) -> AppResult<Order> {
        validate_required_text(driver, "driver", MAX_NAME_LEN)?;
        let driver = driver.trim().to_string();

        let order = self.store.update_with(order_id, |order| {
            if order.driver.as_deref() != Some(driver.as_str()) {
                order.driver = Some(driver.clone());
                order.updated_at = now_millis();
            }
            Ok::<(), AppError>(())
        })?;

        audit_log!(
            actor.id,
            "update_driver",
            format!("order:{order_id}"),
            driver.as_str()
        );
        Ok(order)
    }
}
