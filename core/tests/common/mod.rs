// tests/common/mod.rs
#![allow(dead_code)]

use kobo_flow::{ContextData, FlowError, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

/// A toy settlement context: steps append to `journal` and move `balance`.
#[derive(Clone, Debug, Default)]
pub struct LedgerContext {
  pub balance: i64,
  pub journal: Vec<String>,
  pub stop_after: Option<String>,
  pub frozen: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("posting rejected: {0}")]
  Rejected(String),
}

impl From<FlowError> for LedgerError {
  fn from(err: FlowError) -> Self {
    LedgerError::Flow(format!("{:?}", err))
  }
}

pub fn posting(step: &'static str, amount: i64) -> kobo_flow::Handler<LedgerContext, LedgerError> {
  Box::new(move |ctx: ContextData<LedgerContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.balance += amount;
      guard.journal.push(step.to_string());
      if guard.stop_after.as_deref() == Some(step) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn rejecting(step: &'static str, reason: &'static str) -> kobo_flow::Handler<LedgerContext, LedgerError> {
  Box::new(move |ctx: ContextData<LedgerContext>| {
    Box::pin(async move {
      ctx.write().journal.push(step.to_string());
      Err(LedgerError::Rejected(reason.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
