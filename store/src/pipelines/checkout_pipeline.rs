// store/src/pipelines/checkout_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::pricing;
use crate::services::InitializeRequest;
use kobo_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{error, info, warn};

pub fn register_checkout_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(
    "checkout_initiate",
    &[
      ("validate_request", false, None),
      ("load_catalog_snapshot", false, None),
      ("price_cart", false, None),
      ("create_pending_order", false, None),
      ("initialize_payment", false, None),
    ],
  );

  // Step 1: reject bad input before touching the store.
  p.on("validate_request", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      pricing::validate_lines(&guard.lines)?;
      guard.delivery.validate()?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2: prices are always re-read from the catalog, never taken from the client.
  p.on("load_catalog_snapshot", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, lines, delivery) = {
        let guard = ctx.read();
        (
          guard.app_state.store.clone(),
          guard.lines.clone(),
          guard.delivery.pricing_mode(),
        )
      };
      let snapshot = common_steps::load_catalog_snapshot(store.as_ref(), &lines, &delivery).await?;
      ctx.write().snapshot = Some(snapshot);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3
  p.on("price_cart", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let snapshot = guard
        .snapshot
        .take()
        .ok_or_else(|| AppError::Internal("Catalog snapshot missing before pricing".to_string()))?;
      let delivery = guard.delivery.pricing_mode();
      let quote = common_steps::price_cart(&guard.lines, &delivery, &snapshot, &guard.app_state.config.pricing)?;
      if quote.lines.is_empty() {
        return Err(AppError::Validation(
          "None of the requested products are available".to_string(),
        ));
      }
      // A total the gateway cannot charge must fail before the order row exists.
      pricing::gateway_amount(quote.total)?;
      guard.quote = Some(quote);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 4: the pending row and its reference exist before the gateway hears of them.
  p.on("create_pending_order", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, user_id, quote, delivery) = {
        let guard = ctx.read();
        let quote = guard
          .quote
          .clone()
          .ok_or_else(|| AppError::Internal("Quote missing before order creation".to_string()))?;
        (guard.app_state.store.clone(), guard.user_id, quote, guard.delivery.clone())
      };
      let order = store.create_pending_order(user_id, &quote, &delivery).await?;
      info!(
        order_id = %order.id,
        transaction_ref = %order.transaction_ref,
        total = %order.total,
        "Checkout: pending order recorded."
      );
      ctx.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 5: best effort. On failure the order stays pending and the client may retry.
  p.on("initialize_payment", |ctx: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (gateway, request) = {
        let guard = ctx.read();
        let order = guard
          .order
          .as_ref()
          .ok_or_else(|| AppError::Internal("Order missing before payment initialization".to_string()))?;
        let config = &guard.app_state.config;
        let request = InitializeRequest::for_order(order, &config.currency, &config.payment_callback_url())?;
        (guard.app_state.gateway.clone(), request)
      };

      match gateway.initialize(&request).await {
        Ok(session) => {
          info!(
            transaction_ref = %request.reference,
            gateway = gateway.name(),
            "Checkout: payment session opened."
          );
          ctx.write().session = Some(session);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        Err(AppError::Upstream { message, retryable }) => {
          warn!(
            transaction_ref = %request.reference,
            %message,
            "Checkout: gateway initialize failed; order left pending."
          );
          Err(AppError::Upstream { message, retryable })
        }
        Err(other) => {
          error!(transaction_ref = %request.reference, error = %other, "Checkout: gateway adapter error.");
          Err(AppError::upstream(other.to_string()))
        }
      }
    })
  });

  registry.register_pipeline(p);
  info!("Checkout initiate pipeline registered.");
}
