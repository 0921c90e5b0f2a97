// store/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::pricing::DeliveryMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
}

/// The two ways a pending payment can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
  Paid,
  Failed,
}

impl From<PaymentOutcome> for PaymentStatus {
  fn from(outcome: PaymentOutcome) -> Self {
    match outcome {
      PaymentOutcome::Paid => PaymentStatus::Paid,
      PaymentOutcome::Failed => PaymentStatus::Failed,
    }
  }
}

impl PaymentOutcome {
  /// Gateway `status` strings: `success` means paid, anything else failed.
  pub fn from_gateway_status(status: &str) -> Self {
    if status.trim().eq_ignore_ascii_case("success") {
      PaymentOutcome::Paid
    } else {
      PaymentOutcome::Failed
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "fulfillment_status")]
pub enum FulfillmentStatus {
  Processing,
  Shipped,
  OutForDelivery,
  Delivered,
}

impl FulfillmentStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      FulfillmentStatus::Processing => "Processing",
      FulfillmentStatus::Shipped => "Shipped",
      FulfillmentStatus::OutForDelivery => "OutForDelivery",
      FulfillmentStatus::Delivered => "Delivered",
    }
  }

  /// The only status an order may hold right before `self`.
  pub fn predecessor(self) -> Option<Self> {
    match self {
      FulfillmentStatus::Processing => None,
      FulfillmentStatus::Shipped => Some(FulfillmentStatus::Processing),
      FulfillmentStatus::OutForDelivery => Some(FulfillmentStatus::Shipped),
      FulfillmentStatus::Delivered => Some(FulfillmentStatus::OutForDelivery),
    }
  }

  /// Customer-facing title and message for reaching this status, if any.
  pub fn notification_copy(self, tracking_id: Option<&str>) -> Option<(String, String)> {
    let tracking = tracking_id.unwrap_or("your order");
    match self {
      FulfillmentStatus::Processing => None,
      FulfillmentStatus::Shipped => Some((
        "Your Order Has Been Shipped".to_string(),
        format!("Good news! {} has been shipped and is on its way.", tracking),
      )),
      FulfillmentStatus::OutForDelivery => Some((
        "Your Order is Out for Delivery".to_string(),
        format!("{} is out for delivery and will reach you soon.", tracking),
      )),
      FulfillmentStatus::Delivered => Some((
        "Order Delivered".to_string(),
        format!("{} has been delivered. Thank you for shopping with us!", tracking),
      )),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "delivery_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
  Home,
  Pickup,
}

/// Who receives the order and where. Stored with the order row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
  pub delivery_type: DeliveryType,
  #[serde(alias = "name")]
  pub customer_name: String,
  pub email: String,
  pub phone: String,
  pub address: Option<String>,
  pub landmark: Option<String>,
  pub state: Option<String>,
  pub city: Option<String>,
  pub postal_code: Option<String>,
  pub pickup_station: Option<String>,
  pub extra_instructions: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl DeliveryDetails {
  pub fn validate(&self) -> Result<()> {
    let mut missing = Vec::new();
    if self.customer_name.trim().is_empty() {
      missing.push("name");
    }
    if self.email.trim().is_empty() {
      missing.push("email");
    }
    if self.phone.trim().is_empty() {
      missing.push("phone");
    }
    if self.delivery_type == DeliveryType::Home {
      for (field, value) in [
        ("address", &self.address),
        ("state", &self.state),
        ("city", &self.city),
        ("postalCode", &self.postal_code),
      ] {
        if present(value).is_none() {
          missing.push(field);
        }
      }
    }
    if !missing.is_empty() {
      return Err(AppError::Validation(format!(
        "Missing required delivery fields: {}",
        missing.join(", ")
      )));
    }
    if !self.email.contains('@') {
      return Err(AppError::Validation("A valid email is required".to_string()));
    }
    Ok(())
  }

  /// Non-empty parts of address, landmark, city, state and postal code, joined.
  pub fn formatted_address(&self) -> Option<String> {
    if self.delivery_type == DeliveryType::Pickup {
      return None;
    }
    let parts: Vec<&str> = [&self.address, &self.landmark, &self.city, &self.state, &self.postal_code]
      .into_iter()
      .filter_map(present)
      .collect();
    if parts.is_empty() {
      None
    } else {
      Some(parts.join(", "))
    }
  }

  pub fn pricing_mode(&self) -> DeliveryMode {
    match self.delivery_type {
      DeliveryType::Pickup => DeliveryMode::Pickup,
      DeliveryType::Home => DeliveryMode::Home {
        state: present(&self.state).unwrap_or_default().to_string(),
        city: present(&self.city).unwrap_or_default().to_string(),
      },
    }
  }
}

/// A line as it was priced when the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
  pub product_id: Uuid,
  pub name: String,
  pub quantity: i32,
  pub base_unit_price: Decimal,
  pub unit_price: Decimal,
  /// Only present when the discount was actually applied.
  pub discount_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub tracking_id: Option<String>,
  pub transaction_ref: String,
  pub user_id: Uuid,
  #[sqlx(json)]
  pub items: Vec<OrderLine>,
  pub subtotal: Decimal,
  pub tax_rate: Decimal,
  pub tax_amount: Decimal,
  pub shipping_fee: Decimal,
  pub total: Decimal,
  pub currency: String,
  pub payment_status: PaymentStatus,
  pub fulfillment_status: FulfillmentStatus,
  #[sqlx(flatten)]
  pub delivery: DeliveryDetails,
  pub shipping_address: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
