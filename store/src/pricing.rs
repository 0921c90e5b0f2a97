// store/src/pricing.rs

//! Cart pricing.
//!
//! [`quote`] is a pure function of its inputs: the catalog rows it needs are
//! loaded beforehand into a [`CatalogSnapshot`] and the clock is passed in, so
//! a preview and the pricing done during order creation agree whenever the
//! catalog did not change in between.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Discount, OrderLine, Product, ShippingRate};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: Uuid,
  pub quantity: i32,
  #[serde(default)]
  pub discount_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
  Home { state: String, city: String },
  Pickup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
  pub tax_rate: Decimal,
  /// Home delivery is free when the subtotal is strictly above this.
  pub free_shipping_threshold: Decimal,
  /// Used when neither the city nor the state has a configured rate.
  pub default_shipping_fee: Decimal,
}

impl Default for PricingPolicy {
  fn default() -> Self {
    Self {
      tax_rate: Decimal::new(75, 3),
      free_shipping_threshold: Decimal::from(50000),
      default_shipping_fee: Decimal::from(3500),
    }
  }
}

/// The catalog rows a quote may consult.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
  pub products: HashMap<Uuid, Product>,
  pub discounts: HashMap<Uuid, Discount>,
  /// Keyed by `(state, city)`; `city` may be [`ShippingRate::STATE_DEFAULT_CITY`].
  pub shipping_rates: HashMap<(String, String), Decimal>,
}

impl CatalogSnapshot {
  pub fn with_shipping_rates(mut self, rates: impl IntoIterator<Item = ShippingRate>) -> Self {
    for rate in rates {
      self.shipping_rates.insert((rate.state, rate.city), rate.fee);
    }
    self
  }

  fn shipping_rate_for(&self, state: &str, city: &str) -> Option<Decimal> {
    self
      .shipping_rates
      .get(&(state.to_string(), city.to_string()))
      .or_else(|| {
        self
          .shipping_rates
          .get(&(state.to_string(), ShippingRate::STATE_DEFAULT_CITY.to_string()))
      })
      .copied()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
  pub lines: Vec<OrderLine>,
  /// Requested products missing from the catalog. Their lines are left out.
  pub dropped_lines: Vec<Uuid>,
  pub subtotal: Decimal,
  pub tax_rate: Decimal,
  pub tax_amount: Decimal,
  pub shipping_fee: Decimal,
  pub total: Decimal,
}

/// Product and discount ids a cart refers to, for loading a snapshot.
pub fn referenced_ids(lines: &[CartLine]) -> (Vec<Uuid>, Vec<Uuid>) {
  let mut product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
  let mut discount_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.discount_id).collect();
  product_ids.sort_unstable();
  product_ids.dedup();
  discount_ids.sort_unstable();
  discount_ids.dedup();
  (product_ids, discount_ids)
}

pub fn validate_lines(lines: &[CartLine]) -> Result<()> {
  if lines.is_empty() {
    return Err(AppError::Validation("Cart must contain at least one item".to_string()));
  }
  if let Some(bad) = lines.iter().find(|l| l.quantity <= 0) {
    return Err(AppError::Validation(format!(
      "Quantity for product {} must be at least 1",
      bad.product_id
    )));
  }
  Ok(())
}

pub fn quote(
  lines: &[CartLine],
  delivery: &DeliveryMode,
  catalog: &CatalogSnapshot,
  now: DateTime<Utc>,
  policy: &PricingPolicy,
) -> Result<Quote> {
  validate_lines(lines)?;

  let mut priced = Vec::with_capacity(lines.len());
  let mut dropped_lines = Vec::new();
  let mut subtotal = Decimal::ZERO;

  for line in lines {
    let Some(product) = catalog.products.get(&line.product_id) else {
      dropped_lines.push(line.product_id);
      continue;
    };

    // An unknown, inactive or expired discount prices the line in full.
    let applied = line
      .discount_id
      .and_then(|id| catalog.discounts.get(&id))
      .filter(|d| d.is_applicable(now));
    let unit_price = applied.map_or(product.price, |d| d.apply(product.price));

    subtotal += unit_price * Decimal::from(line.quantity);
    priced.push(OrderLine {
      product_id: product.id,
      name: product.name.clone(),
      quantity: line.quantity,
      base_unit_price: product.price,
      unit_price,
      discount_id: applied.map(|d| d.id),
    });
  }

  let tax_amount = round_money(subtotal * policy.tax_rate);
  let shipping_fee = match delivery {
    DeliveryMode::Pickup => Decimal::ZERO,
    DeliveryMode::Home { .. } if subtotal > policy.free_shipping_threshold => Decimal::ZERO,
    DeliveryMode::Home { state, city } => catalog
      .shipping_rate_for(state, city)
      .unwrap_or(policy.default_shipping_fee),
  };

  Ok(Quote {
    lines: priced,
    dropped_lines,
    subtotal,
    tax_rate: policy.tax_rate,
    tax_amount,
    shipping_fee,
    total: subtotal + tax_amount + shipping_fee,
  })
}

/// Two decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
  amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Whole minor units for the gateway, half away from zero.
pub fn gateway_amount(total: Decimal) -> Result<i64> {
  use rust_decimal::prelude::ToPrimitive;
  total
    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    .to_i64()
    .filter(|amount| *amount > 0)
    .ok_or_else(|| AppError::Validation(format!("Order total {} cannot be charged", total)))
}
