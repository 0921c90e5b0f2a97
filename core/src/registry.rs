// core/src/registry.rs

//! `FlowRegistry<E>`: one registered pipeline per context data type.
//!
//! Callers build a `ContextData<TData>` and ask the registry to run "the flow
//! for `TData`". Pipelines may use their own handler error type as long as the
//! registry's application error `E` can be built from it.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait ErasedFlow<E>: Send + Sync
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn name(&self) -> &str;

  /// `ctx` must hold a `ContextData<TData>` for the wrapped pipeline's `TData`.
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, E>;
}

struct TypedFlow<TData, HandlerErr, E>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<TData, HandlerErr>>,
  _app_err: PhantomData<fn() -> E>,
}

#[async_trait]
impl<TData, HandlerErr, E> ErasedFlow<E> for TypedFlow<TData, HandlerErr, E>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  E: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  fn name(&self) -> &str {
    self.pipeline.name()
  }

  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<PipelineResult, E> {
    let ctx_data = match ctx.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>().to_string();
        event!(Level::ERROR, %expected_type, "Registry dispatched a context of the wrong type.");
        return Err(E::from(FlowError::TypeMismatch { expected_type }));
      }
    };
    self.pipeline.run(ctx_data).await.map_err(E::from)
  }
}

pub struct FlowRegistry<E = FlowError>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn ErasedFlow<E>>>>,
}

impl<E> FlowRegistry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` as the flow for `TData`, replacing any earlier one.
  pub fn register_pipeline<TData, HandlerErr>(&self, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    E: From<HandlerErr>,
  {
    event!(
      Level::DEBUG,
      flow = %pipeline.name(),
      context_type = %std::any::type_name::<TData>(),
      "Registering flow."
    );
    let typed = TypedFlow::<TData, HandlerErr, E> {
      pipeline: Arc::new(pipeline),
      _app_err: PhantomData,
    };
    let previous = self.flows.write().insert(TypeId::of::<TData>(), Arc::new(typed));
    if let Some(previous) = previous {
      event!(Level::WARN, replaced = %previous.name(), "Flow registration replaced an existing flow.");
    }
  }

  pub fn is_registered<TData: 'static + Send + Sync>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the flow registered for `TData` against `ctx_data`.
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, E>
  where
    TData: 'static + Send + Sync,
  {
    let flow = self.flows.read().get(&TypeId::of::<TData>()).cloned();
    let flow = flow.ok_or_else(|| {
      let type_name = std::any::type_name::<TData>().to_string();
      event!(Level::ERROR, %type_name, "No flow registered for context type.");
      E::from(FlowError::NotRegistered { type_name })
    })?;
    flow.run_erased(Box::new(ctx_data)).await
  }
}

impl<E> Default for FlowRegistry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
