// store/src/models/alert.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "alert_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
  /// A paid line could not be taken out of stock.
  StockShortfall,
  /// A payment arrived for a reference with no payable order.
  OrphanPayment,
  /// Stock bookkeeping errored after the payment outcome was recorded.
  StockSyncFailure,
}

/// Operator-facing record of something reconciliation could not settle on its own.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminAlert {
  pub id: Uuid,
  pub kind: AlertKind,
  pub message: String,
  pub product_id: Option<Uuid>,
  pub transaction_ref: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
  pub kind: AlertKind,
  pub message: String,
  pub product_id: Option<Uuid>,
  pub transaction_ref: Option<String>,
}

impl NewAlert {
  pub fn stock_shortfall(product_id: Uuid, product_name: &str, quantity: i32, transaction_ref: &str) -> Self {
    Self {
      kind: AlertKind::StockShortfall,
      message: format!(
        "Insufficient stock for '{}' ({}): {} unit(s) paid on order {}",
        product_name, product_id, quantity, transaction_ref
      ),
      product_id: Some(product_id),
      transaction_ref: Some(transaction_ref.to_string()),
    }
  }

  pub fn orphan_payment(transaction_ref: &str, reason: &str) -> Self {
    Self {
      kind: AlertKind::OrphanPayment,
      message: format!("Payment {} could not be applied: {}", transaction_ref, reason),
      product_id: None,
      transaction_ref: Some(transaction_ref.to_string()),
    }
  }

  pub fn stock_sync_failure(product_id: Uuid, transaction_ref: &str, error: &str) -> Self {
    Self {
      kind: AlertKind::StockSyncFailure,
      message: format!(
        "Stock update for product {} on paid order {} failed: {}",
        product_id, transaction_ref, error
      ),
      product_id: Some(product_id),
      transaction_ref: Some(transaction_ref.to_string()),
    }
  }

  pub fn into_alert(self) -> AdminAlert {
    AdminAlert {
      id: Uuid::new_v4(),
      kind: self.kind,
      message: self.message,
      product_id: self.product_id,
      transaction_ref: self.transaction_ref,
      created_at: Utc::now(),
    }
  }
}
