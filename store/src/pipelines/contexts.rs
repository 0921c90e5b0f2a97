// store/src/pipelines/contexts.rs

//! Working data of each flow. Handlers receive these wrapped in
//! `kobo_flow::ContextData`.

use actix_web::web::Bytes;
use uuid::Uuid;

use crate::models::{DeliveryDetails, FulfillmentStatus, Order, PaymentOutcome, WebhookEvent};
use crate::pricing::{CartLine, CatalogSnapshot, DeliveryMode, Quote};
use crate::services::PaymentSession;
use crate::state::AppState;

#[derive(Clone)]
pub struct PreviewCtxData {
  pub app_state: AppState,
  pub lines: Vec<CartLine>,
  pub delivery: DeliveryMode,
  pub snapshot: Option<CatalogSnapshot>,
  pub quote: Option<Quote>,
}

impl PreviewCtxData {
  pub fn new(app_state: AppState, lines: Vec<CartLine>, delivery: DeliveryMode) -> Self {
    Self {
      app_state,
      lines,
      delivery,
      snapshot: None,
      quote: None,
    }
  }
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub lines: Vec<CartLine>,
  pub delivery: DeliveryDetails,
  pub snapshot: Option<CatalogSnapshot>,
  pub quote: Option<Quote>,
  pub order: Option<Order>,
  pub session: Option<PaymentSession>,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, lines: Vec<CartLine>, delivery: DeliveryDetails) -> Self {
    Self {
      app_state,
      user_id,
      lines,
      delivery,
      snapshot: None,
      quote: None,
      order: None,
      session: None,
    }
  }
}

/// What the webhook flow did with a delivery. Every variant is acknowledged
/// to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
  Received,
  /// This delivery moved the order out of `pending`.
  Applied,
  /// An earlier delivery already finalized the order.
  AlreadyProcessed,
  /// No order matches the reference; an alert was raised.
  OrderNotFound,
  /// A success arrived for an order that already failed; an alert was raised.
  FailedOrderTerminal,
}

impl WebhookDisposition {
  pub fn as_str(self) -> &'static str {
    match self {
      WebhookDisposition::Received => "received",
      WebhookDisposition::Applied => "applied",
      WebhookDisposition::AlreadyProcessed => "already_processed",
      WebhookDisposition::OrderNotFound => "order_not_found",
      WebhookDisposition::FailedOrderTerminal => "failed_order_terminal",
    }
  }
}

#[derive(Clone)]
pub struct WebhookCtxData {
  pub app_state: AppState,
  pub raw_payload: Bytes,
  pub signature_header: Option<String>,
  pub event: Option<WebhookEvent>,
  pub outcome: Option<PaymentOutcome>,
  pub order: Option<Order>,
  pub disposition: WebhookDisposition,
  /// Products whose stock could not cover a paid line.
  pub shortfalls: Vec<Uuid>,
}

impl WebhookCtxData {
  pub fn new(app_state: AppState, raw_payload: Bytes, signature_header: Option<String>) -> Self {
    Self {
      app_state,
      raw_payload,
      signature_header,
      event: None,
      outcome: None,
      order: None,
      disposition: WebhookDisposition::Received,
      shortfalls: Vec::new(),
    }
  }
}

#[derive(Clone)]
pub struct FulfillmentCtxData {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub target: FulfillmentStatus,
  pub actor: String,
  pub order: Option<Order>,
  pub notification_dispatched: bool,
}

impl FulfillmentCtxData {
  pub fn new(app_state: AppState, order_id: Uuid, target: FulfillmentStatus, actor: &str) -> Self {
    Self {
      app_state,
      order_id,
      target,
      actor: actor.to_string(),
      order: None,
      notification_dispatched: false,
    }
  }
}
