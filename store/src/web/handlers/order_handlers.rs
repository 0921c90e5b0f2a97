// store/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::FulfillmentStatus;
use crate::pipelines::contexts::FulfillmentCtxData;
use crate::state::AppState;
use crate::web::extractors::{AuthenticatedUser, Operator};
use kobo_flow::{ContextData, PipelineResult};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentUpdatePayload {
  pub fulfillment_status: FulfillmentStatus,
}

#[instrument(name = "handler::my_orders", skip(app_state, user), fields(user_id = %user.user_id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.store.orders_for_user(user.user_id).await?;
  info!(count = orders.len(), "Listed customer orders.");
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(
  name = "handler::update_fulfillment",
  skip(app_state, operator, path, req_payload),
  fields(order_id = %path, target = req_payload.fulfillment_status.as_str())
)]
pub async fn update_fulfillment_handler(
  app_state: web::Data<AppState>,
  operator: Operator,
  path: web::Path<Uuid>,
  req_payload: web::Json<FulfillmentUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let ctx = ContextData::new(FulfillmentCtxData::new(
    app_state.get_ref().clone(),
    order_id,
    req_payload.fulfillment_status,
    &operator.label,
  ));

  match app_state.flows.run(ctx.clone()).await? {
    PipelineResult::Completed => {
      let guard = ctx.read();
      let order = guard
        .order
        .as_ref()
        .ok_or_else(|| AppError::Internal("Fulfillment update completed without an order".to_string()))?;
      Ok(HttpResponse::Ok().json(json!({
        "orderId": order.id,
        "fulfillmentStatus": order.fulfillment_status,
        "trackingId": order.tracking_id,
        "notificationDispatched": guard.notification_dispatched,
      })))
    }
    PipelineResult::Stopped => Err(AppError::Internal("Fulfillment update did not complete".to_string())),
  }
}
