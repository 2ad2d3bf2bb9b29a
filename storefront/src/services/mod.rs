// storefront/src/services/mod.rs

pub mod auth_service;
pub mod mail;
pub mod media;
pub mod otp;
pub mod pricing;
pub mod slugs;
