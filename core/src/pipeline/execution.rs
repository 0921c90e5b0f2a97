// core/src/pipeline/execution.rs

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::Phase;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// A step is skipped when its `skip_if` predicate holds, or when it is
  /// optional and has no handlers. A required step with no handlers is a
  /// `FlowError::HandlerMissing`. The first handler error aborts the run.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    let run_span = tracing::info_span!("flow_run", flow = %self.name, num_steps = self.steps.len());
    self.run_steps(ctx_data).instrument(run_span).await
  }

  async fn run_steps(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Flow starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(Level::DEBUG, step = step_name, "Step skipped by condition.");
          continue;
        }
      }

      let has_handlers = Phase::ALL
        .iter()
        .any(|phase| !self.handlers_for(step_name, *phase).is_empty());
      if !has_handlers {
        if step_def.optional {
          event!(Level::DEBUG, step = step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step = step_name, "Required step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          flow: self.name.clone(),
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = tracing::debug_span!("flow_step", step = step_name, step_index = step_idx);
      let control = self
        .run_step_phases(step_name, &ctx_data)
        .instrument(step_span)
        .await?;
      if control == PipelineControl::Stop {
        event!(Level::INFO, flow = %self.name, step = step_name, "Flow stopped by handler.");
        return Ok(PipelineResult::Stopped);
      }
    }

    event!(Level::DEBUG, "Flow completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step_phases(&self, step_name: &str, ctx_data: &ContextData<TData>) -> Result<PipelineControl, Err> {
    for phase in Phase::ALL {
      for handler in self.handlers_for(step_name, phase) {
        match handler(ctx_data.clone()).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
          Err(e) => {
            event!(Level::WARN, phase = phase.as_str(), error = %e, "Step handler failed.");
            return Err(e);
          }
        }
      }
    }
    Ok(PipelineControl::Continue)
  }
}
