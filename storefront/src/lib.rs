// storefront/src/lib.rs

//! Audio equipment storefront: catalog, cart, checkout, token auth,
//! password reset by emailed code and admin product management, served as
//! a JSON API over `actix-web` and Postgres.

pub mod config;
pub mod db;
pub mod errors;
pub mod flows;
pub mod models;
pub mod services;
pub mod state;
pub mod web;
