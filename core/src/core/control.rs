// core/src/core/control.rs

//! Flow control signals returned by handlers and the outcome of a run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt the run. Remaining handlers of this step and all later steps are
  /// not executed.
  Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step ran (or was skipped) without a handler stopping the flow.
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}
