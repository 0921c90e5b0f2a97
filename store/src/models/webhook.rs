// store/src/models/webhook.rs

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::errors::{AppError, Result};
use crate::models::order::PaymentOutcome;

#[derive(Debug, Deserialize)]
struct WebhookData {
  reference: String,
  status: String,
  #[serde(default)]
  metadata: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WebhookBody {
  Envelope {
    #[serde(default)]
    event: Option<String>,
    data: WebhookData,
  },
  Bare(WebhookData),
}

/// A gateway callback after parsing. Its content is still untrusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
  pub event: Option<String>,
  pub reference: String,
  pub status: String,
  /// `metadata.orderRef` echoed back from the initialize call.
  pub metadata_order_ref: Option<String>,
}

impl WebhookEvent {
  pub fn parse(raw: &[u8]) -> Result<Self> {
    let body: WebhookBody =
      serde_json::from_slice(raw).map_err(|e| AppError::Validation(format!("Invalid webhook payload: {}", e)))?;
    let (event, data) = match body {
      WebhookBody::Envelope { event, data } => (event, data),
      WebhookBody::Bare(data) => (None, data),
    };

    let reference = data.reference.trim().to_string();
    if reference.is_empty() {
      return Err(AppError::Validation("Webhook payload has an empty reference".to_string()));
    }
    let metadata_order_ref = data
      .metadata
      .as_ref()
      .and_then(|m| m.get("orderRef"))
      .and_then(JsonValue::as_str)
      .map(str::trim)
      .filter(|r| !r.is_empty() && *r != reference)
      .map(String::from);

    Ok(Self {
      event,
      reference,
      status: data.status,
      metadata_order_ref,
    })
  }

  pub fn outcome(&self) -> PaymentOutcome {
    PaymentOutcome::from_gateway_status(&self.status)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_gateway_envelope() {
    let raw = br#"{"event":"charge.success","data":{"reference":"TX-1","status":"success","metadata":{"orderRef":"TX-0"}}}"#;
    let event = WebhookEvent::parse(raw).unwrap();
    assert_eq!(event.event.as_deref(), Some("charge.success"));
    assert_eq!(event.reference, "TX-1");
    assert_eq!(event.metadata_order_ref.as_deref(), Some("TX-0"));
    assert_eq!(event.outcome(), PaymentOutcome::Paid);
  }

  #[test]
  fn parses_bare_payload_and_maps_other_statuses_to_failed() {
    let raw = br#"{"reference":"TX-2","status":"abandoned"}"#;
    let event = WebhookEvent::parse(raw).unwrap();
    assert_eq!(event.event, None);
    assert_eq!(event.metadata_order_ref, None);
    assert_eq!(event.outcome(), PaymentOutcome::Failed);
  }

  #[test]
  fn rejects_payload_without_reference() {
    assert!(matches!(
      WebhookEvent::parse(br#"{"status":"success"}"#),
      Err(AppError::Validation(_))
    ));
    assert!(matches!(
      WebhookEvent::parse(br#"{"reference":"  ","status":"success"}"#),
      Err(AppError::Validation(_))
    ));
  }
}
