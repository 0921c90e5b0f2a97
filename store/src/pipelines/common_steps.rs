// store/src/pipelines/common_steps.rs

//! Steps shared by the preview and checkout flows. They take plain values so
//! each flow's handler reads its own context, releases the lock, then calls in.

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::errors::Result;
use crate::pricing::{self, CartLine, CatalogSnapshot, DeliveryMode, PricingPolicy, Quote};
use crate::store::Store;

#[instrument(name = "common_step::load_catalog_snapshot", skip_all, fields(lines = lines.len()), err(Display))]
pub async fn load_catalog_snapshot(
  store: &dyn Store,
  lines: &[CartLine],
  delivery: &DeliveryMode,
) -> Result<CatalogSnapshot> {
  let (product_ids, discount_ids) = pricing::referenced_ids(lines);
  let destination = match delivery {
    DeliveryMode::Home { state, city } => Some((state.as_str(), city.as_str())),
    DeliveryMode::Pickup => None,
  };
  store.load_snapshot(&product_ids, &discount_ids, destination).await
}

pub fn price_cart(
  lines: &[CartLine],
  delivery: &DeliveryMode,
  snapshot: &CatalogSnapshot,
  policy: &PricingPolicy,
) -> Result<Quote> {
  let quote = pricing::quote(lines, delivery, snapshot, Utc::now(), policy)?;
  if !quote.dropped_lines.is_empty() {
    warn!(dropped = ?quote.dropped_lines, "Unknown products dropped from the cart.");
  }
  info!(
    subtotal = %quote.subtotal,
    tax = %quote.tax_amount,
    shipping = %quote.shipping_fee,
    total = %quote.total,
    "Cart priced."
  );
  Ok(quote)
}
