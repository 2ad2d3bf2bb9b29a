// src/core/step.rs

use super::Shared;
use std::sync::Arc;

/// Predicate evaluated right before a step; `true` skips the whole step.
pub type SkipIf<T> = Arc<dyn Fn(&T) -> bool + Send + Sync + 'static>;

/// One named step of a flow.
#[derive(Clone)]
pub struct Step<T: 'static + Send + Sync> {
  pub name: String,
  /// An optional step without handlers is silently passed over instead of
  /// failing the run with `FlowError::MissingHandler`.
  pub optional: bool,
  pub skip_if: Option<SkipIf<T>>,
}

impl<T: 'static + Send + Sync> Step<T> {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: false,
      skip_if: None,
    }
  }

  /// Evaluates the skip predicate under a short read lock.
  pub(crate) fn should_skip(&self, ctx: &Shared<T>) -> bool {
    match &self.skip_if {
      Some(predicate) => {
        let guard = ctx.read();
        predicate(&*guard)
      }
      None => false,
    }
  }
}

impl<T: 'static + Send + Sync> std::fmt::Debug for Step<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Step")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_if", &self.skip_if.is_some())
      .finish()
  }
}
