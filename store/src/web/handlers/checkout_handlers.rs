// store/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{DeliveryDetails, DeliveryType};
use crate::pipelines::contexts::{CheckoutCtxData, PreviewCtxData};
use crate::pricing::{CartLine, DeliveryMode};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use kobo_flow::{ContextData, PipelineResult};

// --- Request DTOs ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequestPayload {
  pub items: Vec<CartLine>,
  pub delivery_type: DeliveryType,
  pub state: Option<String>,
  pub city: Option<String>,
}

impl PreviewRequestPayload {
  fn delivery_mode(&self) -> DeliveryMode {
    let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or_default().to_string();
    match self.delivery_type {
      DeliveryType::Pickup => DeliveryMode::Pickup,
      DeliveryType::Home => DeliveryMode::Home {
        state: trimmed(&self.state),
        city: trimmed(&self.city),
      },
    }
  }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequestPayload {
  pub items: Vec<CartLine>,
  #[serde(flatten)]
  pub delivery: DeliveryDetails,
}

#[derive(Deserialize, Debug)]
pub struct StatusQuery {
  #[serde(rename = "ref")]
  pub reference: String,
}

// --- Handler Implementations ---

#[instrument(name = "handler::checkout_preview", skip(app_state, req_payload), fields(lines = req_payload.items.len()))]
pub async fn preview_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PreviewRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let delivery = payload.delivery_mode();
  let ctx = ContextData::new(PreviewCtxData::new(app_state.get_ref().clone(), payload.items, delivery));

  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let quote = ctx
        .read()
        .quote
        .clone()
        .ok_or_else(|| AppError::Internal("Preview completed without a quote".to_string()))?;
      Ok(HttpResponse::Ok().json(json!({
        "currency": app_state.config.currency,
        "quote": quote,
      })))
    }
    PipelineResult::Stopped => {
      warn!("Checkout preview flow stopped unexpectedly.");
      Err(AppError::Internal("Checkout preview did not complete".to_string()))
    }
  }
}

#[instrument(
  name = "handler::checkout_initiate",
  skip(app_state, user, req_payload),
  fields(user_id = %user.user_id, lines = req_payload.items.len())
)]
pub async fn initiate_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  req_payload: web::Json<InitiateRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx = ContextData::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    user.user_id,
    payload.items,
    payload.delivery,
  ));

  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx.read();
      let (Some(order), Some(session)) = (guard.order.as_ref(), guard.session.as_ref()) else {
        return Err(AppError::Internal(
          "Checkout completed without an order or payment session".to_string(),
        ));
      };
      info!(order_id = %order.id, transaction_ref = %order.transaction_ref, "Checkout initiated.");
      Ok(HttpResponse::Created().json(json!({
        "redirectUrl": session.redirect_url,
        "reference": order.transaction_ref,
        "orderId": order.id,
        "total": order.total,
        "currency": order.currency,
      })))
    }
    PipelineResult::Stopped => {
      warn!("Checkout flow stopped unexpectedly.");
      Err(AppError::Internal("Checkout did not complete".to_string()))
    }
  }
}

/// Read-only view for the customer's return page. It never changes state; the
/// webhook is the only thing that does.
#[instrument(name = "handler::checkout_status", skip(app_state, user, query), fields(transaction_ref = %query.reference))]
pub async fn status_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<StatusQuery>,
) -> Result<HttpResponse, AppError> {
  let reference = query.reference.trim();
  if reference.is_empty() {
    return Err(AppError::Validation("Query parameter 'ref' is required".to_string()));
  }
  let order = app_state.store.find_by_transaction_ref(reference).await?;
  if order.user_id != user.user_id {
    warn!(target: "security", order_id = %order.id, "Status lookup for another customer's order.");
    return Err(AppError::Forbidden("Order belongs to another customer".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({
    "reference": order.transaction_ref,
    "orderId": order.id,
    "paymentStatus": order.payment_status,
    "fulfillmentStatus": order.fulfillment_status,
    "trackingId": order.tracking_id,
    "total": order.total,
  })))
}
