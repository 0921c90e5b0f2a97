// src/lib.rs

//! kobo-flow: small asynchronous step pipelines.
//!
//! A flow is an ordered list of named steps. Each step may carry `before`,
//! `on` and `after` handlers that receive a shared [`ContextData`] and decide
//! whether the flow continues or stops. Steps can be optional or skipped by a
//! predicate evaluated against the context. A [`FlowRegistry`] keyed by the
//! context data type lets callers run "the flow for this context" without
//! holding on to the pipeline value.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::{Handler, Phase};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;
