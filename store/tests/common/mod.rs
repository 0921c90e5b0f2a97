// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use kobo_flow::ContextData;
use kobo_store::config::AppConfig;
use kobo_store::errors::AppError;
use kobo_store::models::{DeliveryDetails, DeliveryType, Order, Product, ShippingRate};
use kobo_store::pipelines::contexts::{CheckoutCtxData, WebhookCtxData, WebhookDisposition};
use kobo_store::pricing::CartLine;
use kobo_store::services::{signature, MockGateway};
use kobo_store::state::AppState;
use kobo_store::store::MemoryStore;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_reconciliation";
pub const OPERATOR_KEY: &str = "op_test_key";

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub fn test_config() -> AppConfig {
  config_from(&[])
}

/// Baseline test settings, with `overrides` applied on top.
pub fn config_from(overrides: &[(&str, &str)]) -> AppConfig {
  let mut vars: HashMap<String, String> = [
    ("STORE_BACKEND", "memory"),
    ("GATEWAY_MODE", "mock"),
    ("GATEWAY_SECRET_KEY", "sk_test_gateway"),
    ("WEBHOOK_SECRET", WEBHOOK_SECRET),
    ("OPERATOR_API_KEY", OPERATOR_KEY),
    ("FRONTEND_URL", "https://shop.test"),
    ("APP_BASE_URL", "https://api.shop.test"),
  ]
  .into_iter()
  .map(|(k, v)| (k.to_string(), v.to_string()))
  .collect();
  for (k, v) in overrides {
    vars.insert(k.to_string(), v.to_string());
  }
  AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config should load")
}

pub struct TestApp {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<MockGateway>,
}

impl TestApp {
  pub fn new() -> Self {
    setup_tracing();
    let config = Arc::new(test_config());
    let store = Arc::new(MemoryStore::new(&config.currency));
    let gateway = Arc::new(MockGateway::new(&config.app_base_url).with_latency(std::time::Duration::ZERO));
    let state = AppState::new(store.clone(), gateway.clone(), config);
    Self { state, store, gateway }
  }

  pub fn add_product(&self, name: &str, price: i64, stock: i32) -> Product {
    let product = Product::new(name, Decimal::from(price), stock);
    self.store.insert_product(product.clone());
    product
  }

  pub fn add_shipping_rate(&self, state: &str, city: &str, fee: i64) {
    self.store.insert_shipping_rate(ShippingRate {
      state: state.to_string(),
      city: city.to_string(),
      fee: Decimal::from(fee),
    });
  }

  /// Runs the checkout flow and returns the pending order it created.
  pub async fn checkout(&self, user_id: Uuid, lines: Vec<CartLine>, delivery: DeliveryDetails) -> Result<Order, AppError> {
    let ctx = ContextData::new(CheckoutCtxData::new(self.state.clone(), user_id, lines, delivery));
    self.state.flows.run(ctx.clone()).await?;
    let order = ctx.read().order.clone();
    order.ok_or_else(|| AppError::Internal("checkout produced no order".to_string()))
  }

  /// Delivers a correctly signed webhook through the flow.
  pub async fn deliver_webhook(&self, body: &[u8]) -> Result<WebhookDisposition, AppError> {
    let header = signature::sign(WEBHOOK_SECRET, body)?;
    self.deliver_raw_webhook(body, Some(header)).await
  }

  pub async fn deliver_raw_webhook(&self, body: &[u8], header: Option<String>) -> Result<WebhookDisposition, AppError> {
    let ctx = ContextData::new(WebhookCtxData::new(
      self.state.clone(),
      actix_web::web::Bytes::copy_from_slice(body),
      header,
    ));
    self.state.flows.run(ctx.clone()).await?;
    let disposition = ctx.read().disposition;
    Ok(disposition)
  }
}

pub fn line(product_id: Uuid, quantity: i32) -> CartLine {
  CartLine {
    product_id,
    quantity,
    discount_id: None,
  }
}

pub fn home_delivery(state: &str, city: &str) -> DeliveryDetails {
  DeliveryDetails {
    delivery_type: DeliveryType::Home,
    customer_name: "Ada Obi".to_string(),
    email: "ada@example.com".to_string(),
    phone: "+2348000000000".to_string(),
    address: Some("12 Marina Road".to_string()),
    landmark: None,
    state: Some(state.to_string()),
    city: Some(city.to_string()),
    postal_code: Some("101001".to_string()),
    pickup_station: None,
    extra_instructions: None,
  }
}

pub fn pickup_delivery() -> DeliveryDetails {
  DeliveryDetails {
    delivery_type: DeliveryType::Pickup,
    address: None,
    state: None,
    city: None,
    postal_code: None,
    pickup_station: Some("Yaba Hub".to_string()),
    ..home_delivery("", "")
  }
}

pub fn webhook_body(reference: &str, status: &str) -> Vec<u8> {
  json!({
    "event": "charge.success",
    "data": { "reference": reference, "status": status }
  })
  .to_string()
  .into_bytes()
}

pub fn money(amount: &str) -> Decimal {
  amount.parse().expect("valid decimal literal")
}
