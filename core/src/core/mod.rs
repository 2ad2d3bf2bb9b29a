// src/core/mod.rs

//! Building blocks shared by flows and the registry.

pub mod control;
pub mod handler;
pub mod shared;
pub mod step;

pub use control::{Control, Outcome};
pub use handler::Handler;
pub use shared::Shared;
pub use step::{SkipIf, Step};
