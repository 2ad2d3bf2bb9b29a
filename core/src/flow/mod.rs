// src/flow/mod.rs

//! The `Flow<T, E>` type: definition and structural edits, hook
//! registration, and execution.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Flow;
