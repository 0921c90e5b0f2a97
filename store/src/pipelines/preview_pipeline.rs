// store/src/pipelines/preview_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::PreviewCtxData;
use crate::pricing;
use kobo_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::info;

pub fn register_preview_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<PreviewCtxData, AppError>::new(
    "checkout_preview",
    &[
      ("validate_cart", false, None),
      ("load_catalog_snapshot", false, None),
      ("price_cart", false, None),
    ],
  );

  p.on("validate_cart", |ctx: ContextData<PreviewCtxData>| {
    Box::pin(async move {
      pricing::validate_lines(&ctx.read().lines)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("load_catalog_snapshot", |ctx: ContextData<PreviewCtxData>| {
    Box::pin(async move {
      let (store, lines, delivery) = {
        let guard = ctx.read();
        (guard.app_state.store.clone(), guard.lines.clone(), guard.delivery.clone())
      }; // guard dropped
      let snapshot = common_steps::load_catalog_snapshot(store.as_ref(), &lines, &delivery).await?;
      ctx.write().snapshot = Some(snapshot);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("price_cart", |ctx: ContextData<PreviewCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let snapshot = guard
        .snapshot
        .take()
        .ok_or_else(|| AppError::Internal("Catalog snapshot missing before pricing".to_string()))?;
      let quote = common_steps::price_cart(&guard.lines, &guard.delivery, &snapshot, &guard.app_state.config.pricing)?;
      guard.quote = Some(quote);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  info!("Checkout preview pipeline registered.");
}
