// src/core/control.rs

/// Returned by every handler to say whether the flow goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
  /// Run the remaining handlers of this step, then the next steps.
  Continue,
  /// Halt the flow right here. Nothing else runs, the run reports `Outcome::Stopped`.
  Stop,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// Every step that was not skipped ran to the end.
  Completed,
  /// A handler returned `Control::Stop`.
  Stopped,
}

impl Outcome {
  pub fn is_completed(self) -> bool {
    matches!(self, Outcome::Completed)
  }
}
