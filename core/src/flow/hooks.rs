// src/flow/hooks.rs

use crate::core::control::Control;
use crate::core::handler::boxed;
use crate::core::shared::Shared;
use crate::error::FlowError;
use crate::flow::definition::Flow;
use std::future::Future;

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Adds a handler to the `before` phase of a step.
  pub fn before<F, Fut, UE>(&mut self, step_name: &str, handler_fn: F) -> &mut Self
  where
    F: Fn(Shared<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Control, UE>> + Send + 'static,
    UE: Into<E> + 'static,
  {
    self.ensure_step_exists(step_name);
    self.before.entry(step_name.to_string()).or_default().push(boxed(handler_fn));
    self
  }

  /// Adds a handler to the main phase of a step. Handlers of one phase run
  /// in registration order.
  pub fn on<F, Fut, UE>(&mut self, step_name: &str, handler_fn: F) -> &mut Self
  where
    F: Fn(Shared<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Control, UE>> + Send + 'static,
    UE: Into<E> + 'static,
  {
    self.ensure_step_exists(step_name);
    self.on.entry(step_name.to_string()).or_default().push(boxed(handler_fn));
    self
  }

  pub fn after<F, Fut, UE>(&mut self, step_name: &str, handler_fn: F) -> &mut Self
  where
    F: Fn(Shared<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Control, UE>> + Send + 'static,
    UE: Into<E> + 'static,
  {
    self.ensure_step_exists(step_name);
    self.after.entry(step_name.to_string()).or_default().push(boxed(handler_fn));
    self
  }

  pub(crate) fn has_handlers(&self, step_name: &str) -> bool {
    [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(step_name).is_some_and(|handlers| !handlers.is_empty()))
  }
}
