// store/src/services/gateway.rs

//! Outbound side of the payment gateway: opening a hosted payment session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{DeliveryType, Order};
use crate::pricing::gateway_amount;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataItem {
  pub product_id: Uuid,
  pub quantity: i32,
  pub discount_id: Option<Uuid>,
}

/// Echoed back by the gateway in the webhook.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayMetadata {
  pub user_id: Uuid,
  pub order_ref: String,
  pub items: Vec<MetadataItem>,
  pub delivery_type: DeliveryType,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InitializeRequest {
  pub email: String,
  /// Minor currency units.
  pub amount: i64,
  pub currency: String,
  pub reference: String,
  pub callback_url: String,
  pub metadata: GatewayMetadata,
}

impl InitializeRequest {
  pub fn for_order(order: &Order, currency: &str, callback_url: &str) -> Result<Self> {
    Ok(Self {
      email: order.delivery.email.clone(),
      amount: gateway_amount(order.total)?,
      currency: currency.to_string(),
      reference: order.transaction_ref.clone(),
      callback_url: callback_url.to_string(),
      metadata: GatewayMetadata {
        user_id: order.user_id,
        order_ref: order.transaction_ref.clone(),
        items: order
          .items
          .iter()
          .map(|line| MetadataItem {
            product_id: line.product_id,
            quantity: line.quantity,
            discount_id: line.discount_id,
          })
          .collect(),
        delivery_type: order.delivery.delivery_type,
      },
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
  pub redirect_url: String,
  pub provider_reference: String,
  pub access_code: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  fn name(&self) -> &str;

  /// Opens a hosted payment session. Any failure is an `AppError::Upstream`.
  async fn initialize(&self, request: &InitializeRequest) -> Result<PaymentSession>;
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
  status: bool,
  #[serde(default)]
  message: String,
  data: Option<InitializeResponseData>,
}

#[derive(Debug, Deserialize)]
struct InitializeResponseData {
  authorization_url: String,
  #[serde(default)]
  access_code: Option<String>,
  reference: String,
}

/// Paystack-compatible REST gateway.
pub struct HttpGateway {
  client: reqwest::Client,
  base_url: String,
  secret_key: String,
}

impl HttpGateway {
  pub fn new(base_url: &str, secret_key: &str, timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build gateway HTTP client: {}", e)))?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      secret_key: secret_key.to_string(),
    })
  }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
  fn name(&self) -> &str {
    "http"
  }

  #[instrument(
    name = "gateway::initialize",
    skip(self, request),
    fields(reference = %request.reference, amount = request.amount, currency = %request.currency),
    err(Display)
  )]
  async fn initialize(&self, request: &InitializeRequest) -> Result<PaymentSession> {
    let url = format!("{}/transaction/initialize", self.base_url);
    let response = self
      .client
      .post(&url)
      .bearer_auth(&self.secret_key)
      .json(request)
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          warn!("Gateway initialize timed out.");
          AppError::upstream("payment gateway timed out")
        } else {
          AppError::upstream(format!("payment gateway unreachable: {}", e))
        }
      })?;

    let http_status = response.status();
    let body: InitializeResponse = response
      .json()
      .await
      .map_err(|e| AppError::upstream(format!("unreadable gateway response (HTTP {}): {}", http_status, e)))?;

    match body {
      InitializeResponse {
        status: true,
        data: Some(data),
        ..
      } if http_status.is_success() => {
        info!(provider_reference = %data.reference, "Gateway session initialized.");
        Ok(PaymentSession {
          redirect_url: data.authorization_url,
          provider_reference: data.reference,
          access_code: data.access_code,
        })
      }
      InitializeResponse { message, .. } => Err(AppError::upstream(format!(
        "gateway rejected initialize (HTTP {}): {}",
        http_status, message
      ))),
    }
  }
}
