// src/registry.rs

//! `Registry<E>`: flows keyed by their context type.
//!
//! Every context type owns exactly one flow, so a caller dispatches by value:
//! `registry.run(Shared::new(CheckoutCtx { .. }))` runs the checkout flow.
//! Registering a second flow for the same context type replaces the first.

use crate::core::control::Outcome;
use crate::core::shared::Shared;
use crate::error::FlowError;
use crate::flow::Flow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedFlow<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  fn name(&self) -> &str;

  /// `ctx` must be a boxed `Shared<T>` for the flow's own `T`.
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, AppErr>;
}

struct TypedFlow<T, E, AppErr>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: Flow<T, E>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<T, E, AppErr> ErasedFlow<AppErr> for TypedFlow<T, E, AppErr>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<E> + From<FlowError> + Send + Sync + 'static,
{
  fn name(&self) -> &str {
    self.flow.name()
  }

  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, AppErr> {
    let ctx = match ctx.downcast::<Shared<T>>() {
      Ok(ctx) => *ctx,
      Err(_) => {
        return Err(AppErr::from(FlowError::ContextMismatch {
          expected: std::any::type_name::<Shared<T>>().to_string(),
        }))
      }
    };
    self.flow.run(ctx).await.map_err(AppErr::from)
  }
}

/// Flows keyed by context type, returning `AppErr` from `run`.
pub struct Registry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn ErasedFlow<AppErr>>>>,
}

impl<AppErr> Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `flow` as the flow for context type `T`.
  pub fn register<T, E>(&self, flow: Flow<T, E>)
  where
    T: 'static + Send + Sync,
    E: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<E>,
  {
    event!(Level::DEBUG, flow = %flow.name(), context = %std::any::type_name::<T>(), "registering flow");
    let typed = TypedFlow::<T, E, AppErr> {
      flow,
      _app_err: PhantomData,
    };
    if let Some(previous) = self.flows.write().insert(TypeId::of::<T>(), Arc::new(typed)) {
      event!(Level::WARN, replaced = %previous.name(), "flow replaced an earlier registration");
    }
  }

  pub fn contains<T: 'static>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.flows.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.flows.read().is_empty()
  }

  /// Runs the flow registered for `T`. The caller keeps its own clone of
  /// `ctx` to read results afterwards.
  #[instrument(name = "Registry::run", skip_all, fields(context = %std::any::type_name::<T>()))]
  pub async fn run<T>(&self, ctx: Shared<T>) -> Result<Outcome, AppErr>
  where
    T: 'static + Send + Sync,
  {
    let flow = self.flows.read().get(&TypeId::of::<T>()).cloned();
    let Some(flow) = flow else {
      event!(Level::ERROR, "no flow registered");
      return Err(AppErr::from(FlowError::NotRegistered {
        context_type: std::any::type_name::<T>().to_string(),
      }));
    };
    flow.run_erased(Box::new(ctx)).await
  }
}

impl<AppErr> Default for Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> std::fmt::Debug for Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let names: Vec<String> = self.flows.read().values().map(|flow| flow.name().to_string()).collect();
    f.debug_struct("Registry").field("flows", &names).finish()
  }
}
