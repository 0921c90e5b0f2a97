// store/src/store/mod.rs

//! Storage seams of the store.
//!
//! Every mutation that races with another request is a single conditional
//! update in the backing store: `finalize_payment` only leaves `pending` once,
//! `decrement` never takes stock below zero, and `advance_fulfillment` only
//! moves from the expected previous status.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{
  AdminAlert, DeliveryDetails, FulfillmentStatus, NewAlert, NewNotification, Order, PaymentOutcome, PaymentStatus,
};
use crate::pricing::{CatalogSnapshot, Quote};
use crate::services::references;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Catalog: Send + Sync {
  /// Loads the products, discounts and shipping rates a quote may need.
  /// `destination` is `(state, city)` for home delivery.
  async fn load_snapshot(
    &self,
    product_ids: &[Uuid],
    discount_ids: &[Uuid],
    destination: Option<(&str, &str)>,
  ) -> Result<CatalogSnapshot>;
}

/// Result of `finalize_payment`.
#[derive(Debug, Clone)]
pub struct Finalized {
  pub order: Order,
  /// `true` only for the call that moved the order out of `pending`.
  pub changed: bool,
}

#[async_trait]
pub trait OrderLedger: Send + Sync {
  async fn create_pending_order(&self, user_id: Uuid, quote: &Quote, delivery: &DeliveryDetails) -> Result<Order>;

  async fn find_by_transaction_ref(&self, reference: &str) -> Result<Order>;

  async fn find_by_id(&self, order_id: Uuid) -> Result<Order>;

  /// Sets the payment status if and only if it is still `pending`. A paid
  /// outcome also assigns a tracking id unless one exists.
  async fn finalize_payment(&self, reference: &str, outcome: PaymentOutcome) -> Result<Finalized>;

  async fn advance_fulfillment(&self, order_id: Uuid, target: FulfillmentStatus, actor: &str) -> Result<Order>;

  /// Newest first.
  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
  Decremented { remaining: i32 },
  /// Not enough stock (or no such product). Nothing was changed.
  Shortfall,
}

#[async_trait]
pub trait Inventory: Send + Sync {
  async fn decrement(&self, product_id: Uuid, quantity: i32) -> Result<StockOutcome>;
}

#[async_trait]
pub trait AlertSink: Send + Sync {
  /// Records `alert` once per `(kind, transaction_ref, product_id)`. Raising
  /// the same alert again returns the stored one.
  async fn raise(&self, alert: NewAlert) -> Result<AdminAlert>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
  async fn notify(&self, notification: NewNotification) -> Result<()>;
}

/// Everything the flows need from persistence.
pub trait Store: Catalog + OrderLedger + Inventory + AlertSink + Notifier {}

impl<T> Store for T where T: Catalog + OrderLedger + Inventory + AlertSink + Notifier {}

/// Validates delivery details and builds the row `create_pending_order` persists.
pub(crate) fn prepare_pending_order(
  user_id: Uuid,
  quote: &Quote,
  delivery: &DeliveryDetails,
  currency: &str,
) -> Result<Order> {
  delivery.validate()?;
  if quote.lines.is_empty() {
    return Err(AppError::Validation(
      "None of the requested products are available".to_string(),
    ));
  }
  let now = Utc::now();
  Ok(Order {
    id: Uuid::new_v4(),
    tracking_id: None,
    transaction_ref: references::transaction_ref(),
    user_id,
    items: quote.lines.clone(),
    subtotal: quote.subtotal,
    tax_rate: quote.tax_rate,
    tax_amount: quote.tax_amount,
    shipping_fee: quote.shipping_fee,
    total: quote.total,
    currency: currency.to_string(),
    payment_status: PaymentStatus::Pending,
    fulfillment_status: FulfillmentStatus::Processing,
    delivery: delivery.clone(),
    shipping_address: delivery.formatted_address(),
    created_at: now,
    updated_at: now,
  })
}

/// Explains why a conditional fulfillment update matched no row.
pub(crate) fn fulfillment_rejection(current: &Order, target: FulfillmentStatus) -> AppError {
  if current.payment_status != PaymentStatus::Paid {
    return AppError::Validation(format!(
      "Order {} cannot be fulfilled while payment is {:?}",
      current.id, current.payment_status
    ));
  }
  AppError::Conflict(format!(
    "Order {} cannot move from {} to {}",
    current.id,
    current.fulfillment_status.as_str(),
    target.as_str()
  ))
}
