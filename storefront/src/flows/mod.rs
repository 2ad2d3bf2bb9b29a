// storefront/src/flows/mod.rs

//! Business operations that take more than one query, expressed as
//! `storeflow` flows and registered by context type.

use crate::errors::AppError;
use storeflow::Registry;

pub mod contexts;

pub mod cart_flow;
pub mod checkout_flow;
pub mod password_reset_flow;
pub mod product_flow;
pub mod signin_flow;
pub mod signup_flow;

/// Registers every flow with `registry`. Called once while building
/// `AppState`.
pub fn register_all_flows(registry: &Registry<AppError>) {
  signup_flow::register_signup_flow(registry);
  signin_flow::register_signin_flow(registry);
  password_reset_flow::register_password_reset_flows(registry);
  cart_flow::register_add_to_cart_flow(registry);
  checkout_flow::register_checkout_flow(registry);
  product_flow::register_save_product_flow(registry);

  tracing::info!(flows = registry.len(), "All application flows registered.");
}
