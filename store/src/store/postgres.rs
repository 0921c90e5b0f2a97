// store/src/store/postgres.rs

//! PostgreSQL store using runtime `sqlx` queries against the schema in
//! `migrations/0001_init.sql`.

use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{
  fulfillment_rejection, prepare_pending_order, AlertSink, Catalog, Finalized, Inventory, Notifier, OrderLedger,
  StockOutcome,
};
use crate::errors::{AppError, Result};
use crate::models::{
  AdminAlert, DeliveryDetails, Discount, DiscountKind, FulfillmentStatus, NewAlert, NewNotification, Order,
  PaymentOutcome, PaymentStatus, Product, ShippingRate,
};
use crate::pricing::{CatalogSnapshot, Quote};
use crate::services::references;

const ORDER_COLUMNS: &str = "id, tracking_id, transaction_ref, user_id, items, subtotal, tax_rate, tax_amount, \
  shipping_fee, total, currency, payment_status, fulfillment_status, delivery_type, customer_name, email, phone, \
  address, landmark, state, city, postal_code, pickup_station, extra_instructions, shipping_address, created_at, \
  updated_at";

#[derive(Debug, FromRow)]
struct DiscountRow {
  id: Uuid,
  kind: String,
  value: Decimal,
  is_active: bool,
  starts_at: Option<chrono::DateTime<chrono::Utc>>,
  ends_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<DiscountRow> for Discount {
  type Error = AppError;

  fn try_from(row: DiscountRow) -> Result<Self> {
    let kind = match row.kind.as_str() {
      "PERCENTAGE" => DiscountKind::Percentage(row.value),
      "FIXED" => DiscountKind::Fixed(row.value),
      other => {
        return Err(AppError::Internal(format!(
          "Discount {} has unknown kind '{}'",
          row.id, other
        )))
      }
    };
    Ok(Discount {
      id: row.id,
      kind,
      is_active: row.is_active,
      starts_at: row.starts_at,
      ends_at: row.ends_at,
    })
  }
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
  currency: String,
}

impl PgStore {
  pub fn new(pool: PgPool, currency: &str) -> Self {
    Self {
      pool,
      currency: currency.to_string(),
    }
  }

  /// Connects and brings the schema up to date.
  pub async fn connect(database_url: &str, max_connections: u32, currency: &str) -> Result<Self> {
    let store = Self::open(database_url, max_connections, currency).await?;
    info!("Database connected and migrations applied.");
    Ok(store)
  }

  async fn open(database_url: &str, max_connections: u32, currency: &str) -> anyhow::Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await
      .context("connecting to the database")?;
    sqlx::migrate!("./migrations")
      .run(&pool)
      .await
      .context("applying database migrations")?;
    Ok(Self::new(pool, currency))
  }

  async fn fetch_order_by_ref(&self, reference: &str) -> Result<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE transaction_ref = $1", ORDER_COLUMNS);
    Ok(sqlx::query_as::<_, Order>(&sql).bind(reference).fetch_optional(&self.pool).await?)
  }
}

#[async_trait]
impl Catalog for PgStore {
  #[instrument(name = "pg::load_snapshot", skip_all, fields(products = product_ids.len(), discounts = discount_ids.len()))]
  async fn load_snapshot(
    &self,
    product_ids: &[Uuid],
    discount_ids: &[Uuid],
    destination: Option<(&str, &str)>,
  ) -> Result<CatalogSnapshot> {
    let products: Vec<Product> = sqlx::query_as(
      "SELECT id, name, price, stock, discount_id, created_at, updated_at FROM products WHERE id = ANY($1)",
    )
    .bind(product_ids)
    .fetch_all(&self.pool)
    .await?;

    let discount_rows: Vec<DiscountRow> = if discount_ids.is_empty() {
      Vec::new()
    } else {
      sqlx::query_as("SELECT id, kind, value, is_active, starts_at, ends_at FROM discounts WHERE id = ANY($1)")
        .bind(discount_ids)
        .fetch_all(&self.pool)
        .await?
    };

    let rates: Vec<ShippingRate> = match destination {
      Some((state, city)) => {
        sqlx::query_as("SELECT state, city, fee FROM shipping_rates WHERE state = $1 AND city IN ($2, $3)")
          .bind(state)
          .bind(city)
          .bind(ShippingRate::STATE_DEFAULT_CITY)
          .fetch_all(&self.pool)
          .await?
      }
      None => Vec::new(),
    };

    let mut snapshot = CatalogSnapshot::default().with_shipping_rates(rates);
    snapshot.products = products.into_iter().map(|p| (p.id, p)).collect();
    for row in discount_rows {
      let discount = Discount::try_from(row)?;
      snapshot.discounts.insert(discount.id, discount);
    }
    Ok(snapshot)
  }
}

#[async_trait]
impl OrderLedger for PgStore {
  #[instrument(name = "pg::create_pending_order", skip(self, quote, delivery))]
  async fn create_pending_order(&self, user_id: Uuid, quote: &Quote, delivery: &DeliveryDetails) -> Result<Order> {
    let order = prepare_pending_order(user_id, quote, delivery, &self.currency)?;
    let sql = format!(
      "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
       $18, $19, $20, $21, $22, $23, $24, $25, $26, $27) RETURNING {}",
      ORDER_COLUMNS, ORDER_COLUMNS
    );
    let d = &order.delivery;
    let inserted = sqlx::query_as::<_, Order>(&sql)
      .bind(order.id)
      .bind(&order.tracking_id)
      .bind(&order.transaction_ref)
      .bind(order.user_id)
      .bind(Json(&order.items))
      .bind(order.subtotal)
      .bind(order.tax_rate)
      .bind(order.tax_amount)
      .bind(order.shipping_fee)
      .bind(order.total)
      .bind(&order.currency)
      .bind(order.payment_status)
      .bind(order.fulfillment_status)
      .bind(d.delivery_type)
      .bind(&d.customer_name)
      .bind(&d.email)
      .bind(&d.phone)
      .bind(&d.address)
      .bind(&d.landmark)
      .bind(&d.state)
      .bind(&d.city)
      .bind(&d.postal_code)
      .bind(&d.pickup_station)
      .bind(&d.extra_instructions)
      .bind(&order.shipping_address)
      .bind(order.created_at)
      .bind(order.updated_at)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
          AppError::Conflict(format!("Transaction reference {} already exists", order.transaction_ref))
        } else {
          AppError::Sqlx(e)
        }
      })?;
    info!(order_id = %inserted.id, transaction_ref = %inserted.transaction_ref, "Pending order created.");
    Ok(inserted)
  }

  async fn find_by_transaction_ref(&self, reference: &str) -> Result<Order> {
    self
      .fetch_order_by_ref(reference)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("No order with transaction reference {}", reference)))
  }

  async fn find_by_id(&self, order_id: Uuid) -> Result<Order> {
    let sql = format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS);
    sqlx::query_as::<_, Order>(&sql)
      .bind(order_id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))
  }

  #[instrument(name = "pg::finalize_payment", skip(self))]
  async fn finalize_payment(&self, reference: &str, outcome: PaymentOutcome) -> Result<Finalized> {
    let tracking_candidate = match outcome {
      PaymentOutcome::Paid => Some(references::tracking_id()),
      PaymentOutcome::Failed => None,
    };
    let sql = format!(
      "UPDATE orders SET payment_status = $2, tracking_id = COALESCE(tracking_id, $3), updated_at = NOW() \
       WHERE transaction_ref = $1 AND payment_status = 'pending' RETURNING {}",
      ORDER_COLUMNS
    );
    let updated = sqlx::query_as::<_, Order>(&sql)
      .bind(reference)
      .bind(PaymentStatus::from(outcome))
      .bind(tracking_candidate)
      .fetch_optional(&self.pool)
      .await?;

    match updated {
      Some(order) => Ok(Finalized { order, changed: true }),
      None => {
        let order = self.find_by_transaction_ref(reference).await?;
        Ok(Finalized { order, changed: false })
      }
    }
  }

  #[instrument(name = "pg::advance_fulfillment", skip(self))]
  async fn advance_fulfillment(&self, order_id: Uuid, target: FulfillmentStatus, actor: &str) -> Result<Order> {
    let updated = match target.predecessor() {
      Some(previous) => {
        let sql = format!(
          "UPDATE orders SET fulfillment_status = $2, updated_at = NOW() \
           WHERE id = $1 AND payment_status = 'paid' AND fulfillment_status = $3 RETURNING {}",
          ORDER_COLUMNS
        );
        sqlx::query_as::<_, Order>(&sql)
          .bind(order_id)
          .bind(target)
          .bind(previous)
          .fetch_optional(&self.pool)
          .await?
      }
      None => None,
    };

    match updated {
      Some(order) => {
        info!(order_id = %order_id, actor, "Fulfillment advanced.");
        Ok(order)
      }
      None => {
        let current = self.find_by_id(order_id).await?;
        Err(fulfillment_rejection(&current, target))
      }
    }
  }

  async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let sql = format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    );
    Ok(sqlx::query_as::<_, Order>(&sql).bind(user_id).fetch_all(&self.pool).await?)
  }
}

#[async_trait]
impl Inventory for PgStore {
  async fn decrement(&self, product_id: Uuid, quantity: i32) -> Result<StockOutcome> {
    if quantity <= 0 {
      return Err(AppError::Validation(format!("Cannot decrement stock by {}", quantity)));
    }
    let remaining: Option<(i32,)> = sqlx::query_as(
      "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2 RETURNING stock",
    )
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&self.pool)
    .await?;
    Ok(match remaining {
      Some((remaining,)) => StockOutcome::Decremented { remaining },
      None => StockOutcome::Shortfall,
    })
  }
}

#[async_trait]
impl AlertSink for PgStore {
  async fn raise(&self, alert: NewAlert) -> Result<AdminAlert> {
    let alert = alert.into_alert();
    let inserted = sqlx::query_as::<_, AdminAlert>(
      "INSERT INTO admin_alerts (id, kind, message, product_id, transaction_ref, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (kind, COALESCE(transaction_ref, ''), COALESCE(product_id, '00000000-0000-0000-0000-000000000000'::uuid)) \
       DO NOTHING \
       RETURNING id, kind, message, product_id, transaction_ref, created_at",
    )
    .bind(alert.id)
    .bind(alert.kind)
    .bind(&alert.message)
    .bind(alert.product_id)
    .bind(&alert.transaction_ref)
    .bind(alert.created_at)
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| {
      error!(error = %e, kind = ?alert.kind, "Failed to persist admin alert.");
      AppError::Sqlx(e)
    })?;
    if let Some(inserted) = inserted {
      return Ok(inserted);
    }

    Ok(
      sqlx::query_as::<_, AdminAlert>(
        "SELECT id, kind, message, product_id, transaction_ref, created_at FROM admin_alerts \
         WHERE kind = $1 AND transaction_ref IS NOT DISTINCT FROM $2 AND product_id IS NOT DISTINCT FROM $3",
      )
      .bind(alert.kind)
      .bind(&alert.transaction_ref)
      .bind(alert.product_id)
      .fetch_one(&self.pool)
      .await?,
    )
  }
}

#[async_trait]
impl Notifier for PgStore {
  async fn notify(&self, notification: NewNotification) -> Result<()> {
    let n = notification.into_notification();
    sqlx::query(
      "INSERT INTO notifications (id, user_id, order_id, title, message, is_read, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(n.id)
    .bind(n.user_id)
    .bind(n.order_id)
    .bind(&n.title)
    .bind(&n.message)
    .bind(n.is_read)
    .bind(n.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}
