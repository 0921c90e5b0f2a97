// core/src/pipeline/definition.rs

use crate::core::handler::{Handler, Phase};
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered list of named steps over the context data type `TData`.
///
/// Handlers return `Result<PipelineControl, Err>`. `Err` must absorb
/// `FlowError` so that configuration faults found while running (a required
/// step without handlers) surface through the same error channel.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) handlers: HashMap<(String, Phase), Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(step_name, optional, skip_if)` triples.
  pub fn new(name: &str, step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let mut pipeline = Self {
      name: name.to_string(),
      steps: Vec::with_capacity(step_defs.len()),
      handlers: HashMap::new(),
    };
    for (step_name, optional, skip_if) in step_defs {
      pipeline.ensure_step_not_exists(step_name);
      pipeline.steps.push(StepDef {
        name: (*step_name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      });
    }
    pipeline
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  // Step names are compile-time literals in every caller; a miss is a typo in
  // flow wiring, reported at registration time rather than on a request.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("flow '{}': step '{}' is not defined", self.name, step_name);
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!("flow '{}': step '{}' is defined twice", self.name, step_name);
    }
  }

  pub(crate) fn handlers_for(&self, step_name: &str, phase: Phase) -> &[Handler<TData, Err>] {
    self
      .handlers
      .get(&(step_name.to_string(), phase))
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }
}
