// store/src/models/discount.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a discount changes a unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
  /// Percent off the unit price, e.g. `10` for 10%.
  Percentage(Decimal),
  /// Minor units off the unit price.
  Fixed(Decimal),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
  pub id: Uuid,
  pub kind: DiscountKind,
  pub is_active: bool,
  pub starts_at: Option<DateTime<Utc>>,
  pub ends_at: Option<DateTime<Utc>>,
}

impl Discount {
  pub fn new(kind: DiscountKind) -> Self {
    Self {
      id: Uuid::new_v4(),
      kind,
      is_active: true,
      starts_at: None,
      ends_at: None,
    }
  }

  /// Active, and `now` falls inside the window. A missing bound is open.
  pub fn is_applicable(&self, now: DateTime<Utc>) -> bool {
    self.is_active
      && self.starts_at.map_or(true, |start| now >= start)
      && self.ends_at.map_or(true, |end| now <= end)
  }

  /// Discounted unit price, never below zero.
  pub fn apply(&self, unit_price: Decimal) -> Decimal {
    let adjusted = match self.kind {
      DiscountKind::Percentage(percent) => unit_price - unit_price * percent / Decimal::ONE_HUNDRED,
      DiscountKind::Fixed(amount) => unit_price - amount,
    };
    adjusted.max(Decimal::ZERO)
  }
}
