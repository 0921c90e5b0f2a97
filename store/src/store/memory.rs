// store/src/store/memory.rs

//! Process-local store. All tables sit behind one mutex and every conditional
//! update runs entirely under it, which gives the same at-most-once guarantees
//! as the SQL `WHERE` guards in [`super::PgStore`].

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
  fulfillment_rejection, prepare_pending_order, AlertSink, Catalog, Finalized, Inventory, Notifier, OrderLedger,
  StockOutcome,
};
use crate::errors::{AppError, Result};
use crate::models::{
  AdminAlert, DeliveryDetails, Discount, FulfillmentStatus, NewAlert, NewNotification, Notification, Order,
  PaymentOutcome, PaymentStatus, Product, ShippingRate,
};
use crate::pricing::{CatalogSnapshot, Quote};
use crate::services::references;

#[derive(Default)]
struct Tables {
  products: HashMap<Uuid, Product>,
  discounts: HashMap<Uuid, Discount>,
  shipping_rates: HashMap<(String, String), Decimal>,
  orders: HashMap<Uuid, Order>,
  order_ids_by_ref: HashMap<String, Uuid>,
  alerts: Vec<AdminAlert>,
  notifications: Vec<Notification>,
}

pub struct MemoryStore {
  currency: String,
  tables: Mutex<Tables>,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new("NGN")
  }
}

impl MemoryStore {
  pub fn new(currency: &str) -> Self {
    Self {
      currency: currency.to_string(),
      tables: Mutex::new(Tables::default()),
    }
  }

  pub fn insert_product(&self, product: Product) {
    self.tables.lock().products.insert(product.id, product);
  }

  pub fn insert_discount(&self, discount: Discount) {
    self.tables.lock().discounts.insert(discount.id, discount);
  }

  pub fn insert_shipping_rate(&self, rate: ShippingRate) {
    self.tables.lock().shipping_rates.insert((rate.state, rate.city), rate.fee);
  }

  pub fn set_price(&self, product_id: Uuid, price: Decimal) {
    if let Some(product) = self.tables.lock().products.get_mut(&product_id) {
      product.price = price;
    }
  }

  pub fn stock_of(&self, product_id: Uuid) -> Option<i32> {
    self.tables.lock().products.get(&product_id).map(|p| p.stock)
  }

  pub fn alerts(&self) -> Vec<AdminAlert> {
    self.tables.lock().alerts.clone()
  }

  pub fn notifications(&self) -> Vec<Notification> {
    self.tables.lock().notifications.clone()
  }

  pub fn order_count(&self) -> usize {
    self.tables.lock().orders.len()
  }
}

#[async_trait]
impl Catalog for MemoryStore {
  async fn load_snapshot(
    &self,
    product_ids: &[Uuid],
    discount_ids: &[Uuid],
    destination: Option<(&str, &str)>,
  ) -> Result<CatalogSnapshot> {
    let tables = self.tables.lock();
    let mut snapshot = CatalogSnapshot::default();
    for id in product_ids {
      if let Some(product) = tables.products.get(id) {
        snapshot.products.insert(*id, product.clone());
      }
    }
    for id in discount_ids {
      if let Some(discount) = tables.discounts.get(id) {
        snapshot.discounts.insert(*id, discount.clone());
      }
    }
    if let Some((state, city)) = destination {
      for candidate in [city, ShippingRate::STATE_DEFAULT_CITY] {
        let key = (state.to_string(), candidate.to_string());
        if let Some(fee) = tables.shipping_rates.get(&key) {
          snapshot.shipping_rates.insert(key, *fee);
        }
      }
    }
    Ok(snapshot)
  }
}

#[async_trait]
impl OrderLedger for MemoryStore {
  async fn create_pending_order(&self, user_id: Uuid, quote: &Quote, delivery: &DeliveryDetails) -> Result<Order> {
    let order = prepare_pending_order(user_id, quote, delivery, &self.currency)?;
    let mut tables = self.tables.lock();
    if tables.order_ids_by_ref.contains_key(&order.transaction_ref) {
      return Err(AppError::Conflict(format!(
        "Transaction reference {} already exists",
        order.transaction_ref
      )));
    }
    tables.order_ids_by_ref.insert(order.transaction_ref.clone(), order.id);
    tables.orders.insert(order.id, order.clone());
    info!(order_id = %order.id, transaction_ref = %order.transaction_ref, "Pending order created.");
    Ok(order)
  }

  async fn find_by_transaction_ref(&self, reference: &str) -> Result<Order> {
    let tables = self.tables.lock();
    tables
      .order_ids_by_ref
      .get(reference)
      .and_then(|id| tables.orders.get(id))
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("No order with transaction reference {}", reference)))
  }

  async fn find_by_id(&self, order_id: Uuid) -> Result<Order> {
    self
      .tables
      .lock()
      .orders
      .get(&order_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))
  }

  async fn finalize_payment(&self, reference: &str, outcome: PaymentOutcome) -> Result<Finalized> {
    let mut tables = self.tables.lock();
    let order_id = *tables
      .order_ids_by_ref
      .get(reference)
      .ok_or_else(|| AppError::NotFound(format!("No order with transaction reference {}", reference)))?;
    let order = tables
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| AppError::Internal(format!("Reference {} points at a missing order", reference)))?;

    if order.payment_status != PaymentStatus::Pending {
      debug!(transaction_ref = reference, status = ?order.payment_status, "Payment already finalized.");
      return Ok(Finalized {
        order: order.clone(),
        changed: false,
      });
    }
    order.payment_status = outcome.into();
    if outcome == PaymentOutcome::Paid && order.tracking_id.is_none() {
      order.tracking_id = Some(references::tracking_id());
    }
    order.updated_at = Utc::now();
    Ok(Finalized {
      order: order.clone(),
      changed: true,
    })
  }

  async fn advance_fulfillment(&self, order_id: Uuid, target: FulfillmentStatus, actor: &str) -> Result<Order> {
    let mut tables = self.tables.lock();
    let order = tables
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

    let allowed = order.payment_status == PaymentStatus::Paid && target.predecessor() == Some(order.fulfillment_status);
    if !allowed {
      return Err(fulfillment_rejection(order, target));
    }
    order.fulfillment_status = target;
    order.updated_at = Utc::now();
    info!(order_id = %order_id, status = target.as_str(), actor, "Fulfillment advanced.");
    Ok(order.clone())
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let tables = self.tables.lock();
    let mut orders: Vec<Order> = tables.orders.values().filter(|o| o.user_id == user_id).cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }
}

#[async_trait]
impl Inventory for MemoryStore {
  async fn decrement(&self, product_id: Uuid, quantity: i32) -> Result<StockOutcome> {
    if quantity <= 0 {
      return Err(AppError::Validation(format!("Cannot decrement stock by {}", quantity)));
    }
    let mut tables = self.tables.lock();
    match tables.products.get_mut(&product_id) {
      Some(product) if product.stock >= quantity => {
        product.stock -= quantity;
        product.updated_at = Utc::now();
        Ok(StockOutcome::Decremented {
          remaining: product.stock,
        })
      }
      _ => Ok(StockOutcome::Shortfall),
    }
  }
}

#[async_trait]
impl AlertSink for MemoryStore {
  async fn raise(&self, alert: NewAlert) -> Result<AdminAlert> {
    let mut tables = self.tables.lock();
    if let Some(existing) = tables.alerts.iter().find(|a| {
      a.kind == alert.kind && a.transaction_ref == alert.transaction_ref && a.product_id == alert.product_id
    }) {
      debug!(kind = ?alert.kind, transaction_ref = ?alert.transaction_ref, "Alert already raised.");
      return Ok(existing.clone());
    }
    let alert = alert.into_alert();
    tables.alerts.push(alert.clone());
    Ok(alert)
  }
}

#[async_trait]
impl Notifier for MemoryStore {
  async fn notify(&self, notification: NewNotification) -> Result<()> {
    self.tables.lock().notifications.push(notification.into_notification());
    Ok(())
  }
}
