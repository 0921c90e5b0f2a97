// store/src/pipelines/mod.rs

//! Defines and registers every flow the store runs.

use crate::errors::AppError;
use kobo_flow::FlowRegistry;

pub mod common_steps;
pub mod contexts;

pub mod checkout_pipeline;
pub mod fulfillment_pipeline;
pub mod preview_pipeline;
pub mod webhook_pipeline;

/// Registers all flows with `registry`. Called once while building `AppState`.
pub fn register_all_pipelines(registry: &FlowRegistry<AppError>) {
  tracing::info!("Registering flows...");

  preview_pipeline::register_preview_pipeline(registry);
  checkout_pipeline::register_checkout_pipeline(registry);
  webhook_pipeline::register_webhook_pipeline(registry);
  fulfillment_pipeline::register_fulfillment_pipeline(registry);

  tracing::info!("All store flows registered.");
}
