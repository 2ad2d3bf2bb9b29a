// src/flow/definition.rs

use crate::core::handler::Handler;
use crate::core::step::{SkipIf, Step};
use crate::error::FlowError;
use std::collections::HashMap;
use std::sync::Arc;

/// An ordered list of named steps over a context `T`, whose handlers fail
/// with `E`.
///
/// `E` has to absorb engine errors (`From<FlowError>`) because a run can
/// fail for reasons no handler produced, e.g. a required step without
/// handlers.
pub struct Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<Step<T>>,
  pub(crate) before: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) on: HashMap<String, Vec<Handler<T, E>>>,
  pub(crate) after: HashMap<String, Vec<Handler<T, E>>>,
}

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a flow with the given required steps, in order.
  ///
  /// Panics on duplicate step names: that is a wiring bug, caught at startup.
  pub fn new(name: impl Into<String>, step_names: &[&str]) -> Self {
    let mut flow = Self {
      name: name.into(),
      steps: Vec::with_capacity(step_names.len()),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    };
    for step_name in step_names {
      flow.ensure_step_absent(step_name);
      flow.steps.push(Step::new(*step_name));
    }
    flow
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub(crate) fn position(&self, step_name: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.name == step_name)
  }

  /// Panics when the step is unknown. Hook registration and structural edits
  /// go through here so a typo in a step name fails loudly at startup.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) -> usize {
    match self.position(step_name) {
      Some(idx) => idx,
      None => panic!(
        "{}",
        FlowError::UnknownStep {
          flow: self.name.clone(),
          step: step_name.to_string(),
        }
      ),
    }
  }

  fn ensure_step_absent(&self, step_name: &str) {
    if self.position(step_name).is_some() {
      panic!("flow '{}' already has a step named '{}'", self.name, step_name);
    }
  }

  pub fn insert_before(&mut self, existing_step: &str, new_step: &str) -> &mut Self {
    let idx = self.ensure_step_exists(existing_step);
    self.ensure_step_absent(new_step);
    self.steps.insert(idx, Step::new(new_step));
    self
  }

  pub fn insert_after(&mut self, existing_step: &str, new_step: &str) -> &mut Self {
    let idx = self.ensure_step_exists(existing_step);
    self.ensure_step_absent(new_step);
    self.steps.insert(idx + 1, Step::new(new_step));
    self
  }

  /// Removes a step and its handlers. Unknown names are ignored.
  pub fn remove_step(&mut self, step_name: &str) -> &mut Self {
    if let Some(idx) = self.position(step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
      self.after.remove(step_name);
    }
    self
  }

  pub fn optional(&mut self, step_name: &str) -> &mut Self {
    let idx = self.ensure_step_exists(step_name);
    self.steps[idx].optional = true;
    self
  }

  pub fn skip_when(
    &mut self,
    step_name: &str,
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
  ) -> &mut Self {
    let idx = self.ensure_step_exists(step_name);
    let skip_if: SkipIf<T> = Arc::new(predicate);
    self.steps[idx].skip_if = Some(skip_if);
    self
  }
}

impl<T, E> std::fmt::Debug for Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Flow")
      .field("name", &self.name)
      .field("steps", &self.steps)
      .finish_non_exhaustive()
  }
}
