// store/src/pipelines/fulfillment_pipeline.rs

use crate::errors::AppError;
use crate::models::{FulfillmentStatus, NewNotification};
use crate::pipelines::contexts::FulfillmentCtxData;
use kobo_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{info, warn, Instrument};

pub fn register_fulfillment_pipeline(registry: &FlowRegistry<AppError>) {
  let mut p = Pipeline::<FulfillmentCtxData, AppError>::new(
    "fulfillment_advance",
    &[
      ("validate_target", false, None),
      ("advance_status", false, None),
      ("notify_customer", true, None),
    ],
  );

  p.on("validate_target", |ctx: ContextData<FulfillmentCtxData>| {
    Box::pin(async move {
      let target = ctx.read().target;
      if target == FulfillmentStatus::Processing {
        return Err(AppError::Conflict(
          "Orders start in Processing; it cannot be set again".to_string(),
        ));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // The ledger update is conditional on the previous status, so two operators
  // racing on the same order cannot both advance it.
  p.on("advance_status", |ctx: ContextData<FulfillmentCtxData>| {
    Box::pin(async move {
      let (store, order_id, target, actor) = {
        let guard = ctx.read();
        (guard.app_state.store.clone(), guard.order_id, guard.target, guard.actor.clone())
      };
      let order = store.advance_fulfillment(order_id, target, &actor).await?;
      ctx.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Fire-and-forget; the transition already happened whatever the notifier does.
  p.on("notify_customer", |ctx: ContextData<FulfillmentCtxData>| {
    Box::pin(async move {
      let (store, notification) = {
        let guard = ctx.read();
        let Some(order) = guard.order.as_ref() else {
          return Ok::<_, AppError>(PipelineControl::Continue);
        };
        let Some((title, message)) = order.fulfillment_status.notification_copy(order.tracking_id.as_deref()) else {
          return Ok(PipelineControl::Continue);
        };
        (
          guard.app_state.store.clone(),
          NewNotification {
            user_id: order.user_id,
            order_id: order.id,
            title,
            message,
          },
        )
      };

      let span = tracing::info_span!("notify_customer", order_id = %notification.order_id);
      tokio::spawn(
        async move {
          match store.notify(notification).await {
            Ok(()) => info!("Customer notification stored."),
            Err(e) => warn!(error = %e, "Customer notification failed."),
          }
        }
        .instrument(span),
      );
      ctx.write().notification_dispatched = true;
      Ok(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  info!("Fulfillment pipeline registered.");
}
