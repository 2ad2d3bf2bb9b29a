// src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Errors raised by the engine itself, as opposed to errors produced by
/// application handlers. Application error types implement `From<FlowError>`
/// so both kinds travel through one `Result`.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("flow '{flow}' has no step named '{step}'")]
  UnknownStep { flow: String, step: String },

  #[error("flow '{flow}': required step '{step}' has no handlers")]
  MissingHandler { flow: String, step: String },

  #[error("context type mismatch while dispatching flow (expected {expected})")]
  ContextMismatch { expected: String },

  #[error("no flow registered for context type {context_type}")]
  NotRegistered { context_type: String },

  #[error("handler failed: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for FlowError {
  fn from(source: AnyhowError) -> Self {
    FlowError::Handler { source }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
