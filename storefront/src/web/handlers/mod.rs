// storefront/src/web/handlers/mod.rs

pub mod admin_product_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod catalog_handlers;
pub mod contact_handlers;
pub mod order_handlers;
pub mod password_handlers;
pub mod settings_handlers;

use crate::errors::AppError;
use crate::state::AppState;
use storeflow::{Outcome, Shared};
use tracing::warn;

/// Runs the flow registered for `T` and treats an early stop as a server
/// fault: every flow here reports business failures as errors.
pub(crate) async fn run_flow<T>(app_state: &AppState, ctx: &Shared<T>) -> Result<(), AppError>
where
  T: 'static + Send + Sync,
{
  match app_state.flows.run(ctx.clone()).await? {
    Outcome::Completed => Ok(()),
    Outcome::Stopped => {
      warn!(context = %std::any::type_name::<T>(), "Flow was stopped by a handler.");
      Err(AppError::Internal("Request processing was halted by an internal step.".to_string()))
    }
  }
}
