// storefront/src/web/mod.rs

pub mod auth;
pub mod handlers;
pub mod multipart;
pub mod payloads;
pub mod routes;

pub use routes::configure_app_routes;
