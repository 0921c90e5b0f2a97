// store/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  /// Unit price in minor currency units.
  pub price: Decimal,
  pub stock: i32,
  /// Set by merchandising jobs; checkout only honours the discount a cart line names.
  pub discount_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn new(name: impl Into<String>, price: Decimal, stock: i32) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4(),
      name: name.into(),
      price,
      stock,
      discount_id: None,
      created_at: now,
      updated_at: now,
    }
  }
}

/// Home-delivery fee for a destination. `city = "default"` covers a whole state.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ShippingRate {
  pub state: String,
  pub city: String,
  pub fee: Decimal,
}

impl ShippingRate {
  pub const STATE_DEFAULT_CITY: &'static str = "default";
}
