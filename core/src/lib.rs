// src/lib.rs

//! storeflow: small asynchronous step flows for the storefront.
//!
//! A business operation (sign-up, add-to-cart, checkout, ...) is described as
//! a [`Flow`] of named steps operating on a shared, lockable context
//! [`Shared<T>`]. Each step has three handler phases (`before`, `on`,
//! `after`); any handler may halt the flow with [`Control::Stop`] or fail it
//! with an error. Flows are registered in a [`Registry`] keyed by their
//! context type, so a web handler only has to build the context and call
//! `registry.run(ctx)`.
//!
//! ```ignore
//! let mut flow = Flow::<CheckoutCtx, AppError>::new("checkout", &["validate", "persist"]);
//! flow.on("validate", |ctx: Shared<CheckoutCtx>| async move { Ok::<_, AppError>(Control::Continue) });
//! flow.on("persist", persist_order);
//! registry.register(flow);
//! registry.run(Shared::new(ctx)).await?;
//! ```

pub mod core;
pub mod error;
pub mod flow;
pub mod registry;

pub use crate::core::control::{Control, Outcome};
pub use crate::core::handler::Handler;
pub use crate::core::shared::Shared;
pub use crate::core::step::{SkipIf, Step};

pub use crate::flow::Flow;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Registry;
