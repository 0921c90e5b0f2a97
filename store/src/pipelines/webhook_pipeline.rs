// store/src/pipelines/webhook_pipeline.rs

//! Payment reconciliation.
//!
//! A verified gateway callback is tied to its order, the payment outcome is
//! claimed with the ledger's conditional update, and only the delivery that
//! won the claim applies stock effects. Deliveries are at-least-once and may
//! race each other, so every "already done" path ends the flow quietly and the
//! HTTP layer still acknowledges it.
//!
//! Errors raised before the claim propagate so the gateway retries. After the
//! claim the outcome is durable and problems become operator alerts instead.

use crate::errors::AppError;
use crate::models::{NewAlert, PaymentOutcome, PaymentStatus};
use crate::pipelines::contexts::{WebhookCtxData, WebhookDisposition};
use crate::services::signature;
use crate::store::StockOutcome;
use kobo_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("Webhook flow: {} missing from context", what))
}

pub fn register_webhook_pipeline(registry: &FlowRegistry<AppError>) {
  let unless_paid: SkipCondition<WebhookCtxData> =
    Arc::new(|ctx: ContextData<WebhookCtxData>| ctx.with(|c| c.outcome != Some(PaymentOutcome::Paid)));

  let mut p = Pipeline::<WebhookCtxData, AppError>::new(
    "payment_webhook",
    &[
      ("verify_signature", false, None),
      ("parse_payload", false, None),
      ("locate_order", false, None),
      ("guard_already_finalized", false, None),
      ("claim_outcome", false, None),
      ("apply_inventory_effects", false, Some(unless_paid)),
      ("acknowledge", false, None),
    ],
  );

  // Step 1: nothing in the body is looked at before the signature checks out.
  p.on("verify_signature", |ctx: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      let secret = &guard.app_state.config.webhook_secret;
      if let Err(e) = signature::verify(secret, &guard.raw_payload, guard.signature_header.as_deref()) {
        warn!(
          target: "security",
          error = %e,
          payload_bytes = guard.raw_payload.len(),
          "Rejected payment webhook with invalid signature."
        );
        return Err(e);
      }
      debug!("Webhook signature verified.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2
  p.on("parse_payload", |ctx: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let event = crate::models::WebhookEvent::parse(&guard.raw_payload)?;
      let outcome = event.outcome();
      info!(
        transaction_ref = %event.reference,
        gateway_status = %event.status,
        gateway_event = ?event.event,
        ?outcome,
        "Webhook parsed."
      );
      guard.outcome = Some(outcome);
      guard.event = Some(event);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3: by reference, then by the order reference echoed in metadata.
  p.on("locate_order", |ctx: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let (store, event) = {
        let guard = ctx.read();
        (guard.app_state.store.clone(), guard.event.clone().ok_or_else(|| missing("event"))?)
      };

      let mut found = match store.find_by_transaction_ref(&event.reference).await {
        Ok(order) => Some(order),
        Err(AppError::NotFound(_)) => None,
        Err(e) => return Err(e),
      };
      if found.is_none() {
        if let Some(fallback) = &event.metadata_order_ref {
          found = match store.find_by_transaction_ref(fallback).await {
            Ok(order) => {
              info!(transaction_ref = %event.reference, order_ref = %fallback, "Order located through metadata.");
              Some(order)
            }
            Err(AppError::NotFound(_)) => None,
            Err(e) => return Err(e),
          };
        }
      }

      match found {
        Some(order) => {
          ctx.write().order = Some(order);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        None => {
          warn!(
            transaction_ref = %event.reference,
            gateway_status = %event.status,
            "Webhook references no known order; acknowledging."
          );
          let reason = format!("no order matches (gateway status '{}')", event.status);
          store.raise(NewAlert::orphan_payment(&event.reference, &reason)).await?;
          ctx.write().disposition = WebhookDisposition::OrderNotFound;
          Ok(PipelineControl::Stop)
        }
      }
    })
  });

  // Step 4: cheap read-side guard against replays. The claim below is the real one.
  p.on("guard_already_finalized", |ctx: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let (store, status, reference, outcome) = {
        let guard = ctx.read();
        let order = guard.order.as_ref().ok_or_else(|| missing("order"))?;
        (
          guard.app_state.store.clone(),
          order.payment_status,
          order.transaction_ref.clone(),
          guard.outcome.ok_or_else(|| missing("outcome"))?,
        )
      };

      let disposition = match (status, outcome) {
        (PaymentStatus::Pending, _) => return Ok::<_, AppError>(PipelineControl::Continue),
        (PaymentStatus::Failed, PaymentOutcome::Paid) => {
          warn!(transaction_ref = %reference, "Success webhook for an order that already failed.");
          store
            .raise(NewAlert::orphan_payment(&reference, "order had already failed; refund or re-create it"))
            .await?;
          WebhookDisposition::FailedOrderTerminal
        }
        (PaymentStatus::Paid, _) | (PaymentStatus::Failed, PaymentOutcome::Failed) => {
          info!(transaction_ref = %reference, ?status, "Webhook already processed; acknowledging.");
          WebhookDisposition::AlreadyProcessed
        }
      };
      ctx.write().disposition = disposition;
      Ok(PipelineControl::Stop)
    })
  });

  // Step 5: exactly one delivery per reference gets `changed == true`.
  p.on("claim_outcome", |ctx: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let (store, reference, outcome) = {
        let guard = ctx.read();
        let order = guard.order.as_ref().ok_or_else(|| missing("order"))?;
        (
          guard.app_state.store.clone(),
          order.transaction_ref.clone(),
          guard.outcome.ok_or_else(|| missing("outcome"))?,
        )
      };

      let finalized = store.finalize_payment(&reference, outcome).await?;
      if finalized.changed {
        info!(
          transaction_ref = %reference,
          status = ?finalized.order.payment_status,
          tracking_id = ?finalized.order.tracking_id,
          "Payment outcome recorded."
        );
        let mut guard = ctx.write();
        guard.order = Some(finalized.order);
        guard.disposition = WebhookDisposition::Applied;
        return Ok::<_, AppError>(PipelineControl::Continue);
      }

      // Another delivery finalized the order between the guard and the claim.
      let disposition = if finalized.order.payment_status == PaymentStatus::Failed && outcome == PaymentOutcome::Paid {
        store
          .raise(NewAlert::orphan_payment(&reference, "order had already failed; refund or re-create it"))
          .await?;
        WebhookDisposition::FailedOrderTerminal
      } else {
        info!(transaction_ref = %reference, "Concurrent delivery already finalized the order.");
        WebhookDisposition::AlreadyProcessed
      };
      ctx.write().disposition = disposition;
      Ok(PipelineControl::Stop)
    })
  });

  // Step 6: paid orders only. Shortfalls and stock errors never fail the webhook.
  p.on("apply_inventory_effects", |ctx: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let (store, order) = {
        let guard = ctx.read();
        (guard.app_state.store.clone(), guard.order.clone().ok_or_else(|| missing("order"))?)
      };

      let mut shortfalls = Vec::new();
      for line in &order.items {
        let alert = match store.decrement(line.product_id, line.quantity).await {
          Ok(StockOutcome::Decremented { remaining }) => {
            debug!(product_id = %line.product_id, quantity = line.quantity, remaining, "Stock decremented.");
            continue;
          }
          Ok(StockOutcome::Shortfall) => {
            warn!(
              product_id = %line.product_id,
              quantity = line.quantity,
              transaction_ref = %order.transaction_ref,
              "Stock shortfall on paid order."
            );
            shortfalls.push(line.product_id);
            NewAlert::stock_shortfall(line.product_id, &line.name, line.quantity, &order.transaction_ref)
          }
          Err(e) => {
            error!(
              product_id = %line.product_id,
              transaction_ref = %order.transaction_ref,
              error = %e,
              "Stock decrement failed after payment was recorded."
            );
            NewAlert::stock_sync_failure(line.product_id, &order.transaction_ref, &e.to_string())
          }
        };
        if let Err(e) = store.raise(alert).await {
          error!(error = %e, transaction_ref = %order.transaction_ref, "Failed to record admin alert.");
        }
      }

      ctx.write().shortfalls = shortfalls;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 7
  p.on("acknowledge", |ctx: ContextData<WebhookCtxData>| {
    Box::pin(async move {
      let guard = ctx.read();
      info!(
        transaction_ref = ?guard.order.as_ref().map(|o| o.transaction_ref.as_str()),
        disposition = guard.disposition.as_str(),
        shortfalls = guard.shortfalls.len(),
        "Webhook reconciled."
      );
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  registry.register_pipeline(p);
  info!("Payment webhook pipeline registered.");
}
