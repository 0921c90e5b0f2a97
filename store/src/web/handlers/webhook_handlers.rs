// store/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::contexts::WebhookCtxData;
use crate::state::AppState;
use kobo_flow::{ContextData, PipelineResult};

const SIGNATURE_HEADERS: [&str; 2] = ["x-signature", "x-paystack-signature"];

fn signature_header(req: &HttpRequest) -> Option<String> {
  SIGNATURE_HEADERS
    .iter()
    .find_map(|name| req.headers().get(*name))
    .and_then(|v| v.to_str().ok())
    .map(String::from)
}

/// Gateway callback. Anything the flow finishes, including replays and
/// unknown references, is acknowledged with 200 so the gateway stops
/// retrying. Errors map to non-2xx and the gateway retries.
#[instrument(name = "handler::payment_webhook", skip(app_state, req, body), fields(payload_bytes = body.len()))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(WebhookCtxData::new(
    app_state.get_ref().clone(),
    body,
    signature_header(&req),
  ));

  let result = app_state.flows.run(ctx.clone()).await?;
  let disposition = ctx.read().disposition;
  info!(
    stopped = result == PipelineResult::Stopped,
    disposition = disposition.as_str(),
    "Payment webhook acknowledged."
  );
  Ok(HttpResponse::Ok().json(json!({
    "status": "acknowledged",
    "disposition": disposition.as_str(),
  })))
}
