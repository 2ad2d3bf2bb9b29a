// storefront/src/config.rs

use crate::errors::{AppError, Result};
use crate::web::routes::MAX_BODY_BYTES;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Credentials for the hosted image service. Absent when not configured.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
  pub cloud_name: String,
  pub api_key: String,
  pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
  pub host: String,
  pub port: u16,
  pub username: Option<String>,
  pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,
  pub app_base_url: String,

  pub seed_db: bool,
  pub run_migrations: bool,

  pub otp_ttl_minutes: i64,
  pub shipping_fee_cents: i64,
  pub max_image_bytes: usize,

  pub cloudinary: Option<CloudinaryConfig>,
  pub cloudinary_folder: String,

  pub smtp: Option<SmtpConfig>,
  pub mail_from_address: String,
  pub mail_to_address: String,
}

fn optional_env(var_name: &str) -> Option<String> {
  env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match optional_env(var_name) {
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e))),
    None => Ok(default),
  }
}

/// Uploads arrive inside a request body, so an image limit at or above the
/// body limit could never be reached.
fn check_image_limit(max_image_bytes: usize) -> Result<()> {
  if max_image_bytes >= MAX_BODY_BYTES {
    return Err(AppError::Config(format!(
      "MAX_IMAGE_BYTES must be below the {} byte request body limit",
      MAX_BODY_BYTES
    )));
  }
  Ok(())
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let server_host = optional_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parsed_env("SERVER_PORT", 8080u16)?;
    let database_url = optional_env("DATABASE_URL")
      .ok_or_else(|| AppError::Config("Missing environment variable 'DATABASE_URL'".to_string()))?;
    let app_base_url = optional_env("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

    let cloudinary = match (
      optional_env("CLOUDINARY_CLOUD_NAME"),
      optional_env("CLOUDINARY_API_KEY"),
      optional_env("CLOUDINARY_API_SECRET"),
    ) {
      (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
        cloud_name,
        api_key,
        api_secret,
      }),
      (None, None, None) => None,
      _ => {
        return Err(AppError::Config(
          "CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET must be set together".to_string(),
        ))
      }
    };

    let smtp = match optional_env("SMTP_HOST") {
      Some(host) => Some(SmtpConfig {
        host,
        port: parsed_env("SMTP_PORT", 587u16)?,
        username: optional_env("SMTP_USERNAME"),
        password: optional_env("SMTP_PASSWORD"),
      }),
      None => None,
    };

    let mail_from_address = optional_env("MAIL_FROM_ADDRESS").unwrap_or_else(|| "noreply@example.com".to_string());
    let mail_to_address = optional_env("MAIL_TO_ADDRESS").unwrap_or_else(|| mail_from_address.clone());

    let config = Self {
      server_host,
      server_port,
      database_url,
      database_max_connections: parsed_env("DATABASE_MAX_CONNECTIONS", 10u32)?,
      app_base_url,
      seed_db: parsed_env("SEED_DB", false)?,
      run_migrations: parsed_env("RUN_MIGRATIONS", true)?,
      otp_ttl_minutes: parsed_env("OTP_TTL_MINUTES", 10i64)?,
      shipping_fee_cents: parsed_env("SHIPPING_FEE_CENTS", 0i64)?,
      max_image_bytes: parsed_env("MAX_IMAGE_BYTES", 5 * 1024 * 1024usize)?,
      cloudinary,
      cloudinary_folder: optional_env("CLOUDINARY_FOLDER").unwrap_or_else(|| "devialet/products".to_string()),
      smtp,
      mail_from_address,
      mail_to_address,
    };

    if config.shipping_fee_cents < 0 {
      return Err(AppError::Config("SHIPPING_FEE_CENTS must not be negative".to_string()));
    }
    check_image_limit(config.max_image_bytes)?;

    tracing::info!(
      host = %config.server_host,
      port = config.server_port,
      smtp = config.smtp.is_some(),
      image_host = config.cloudinary.is_some(),
      "Application configuration loaded."
    );
    Ok(config)
  }

  /// Configuration used by tests and tools that never touch the network.
  pub fn for_tests(database_url: &str) -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: database_url.to_string(),
      database_max_connections: 1,
      app_base_url: "http://localhost".to_string(),
      seed_db: false,
      run_migrations: false,
      otp_ttl_minutes: 10,
      shipping_fee_cents: 0,
      max_image_bytes: 5 * 1024 * 1024,
      cloudinary: None,
      cloudinary_folder: "devialet/products".to_string(),
      smtp: None,
      mail_from_address: "noreply@example.com".to_string(),
      mail_to_address: "noreply@example.com".to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parsed_env_falls_back_to_default_when_unset() {
    let value: u16 = parsed_env("AUDIO_STORE_TEST_SURELY_UNSET_VAR", 4242).unwrap();
    assert_eq!(value, 4242);
  }

  #[test]
  fn image_limit_must_fit_inside_a_request_body() {
    assert!(check_image_limit(AppConfig::for_tests("postgres://localhost/test").max_image_bytes).is_ok());
    assert!(matches!(check_image_limit(MAX_BODY_BYTES), Err(AppError::Config(_))));
    assert!(matches!(check_image_limit(64 * 1024 * 1024), Err(AppError::Config(_))));
  }

  #[test]
  fn test_config_has_free_shipping() {
    let cfg = AppConfig::for_tests("postgres://localhost/test");
    assert_eq!(cfg.shipping_fee_cents, 0);
    assert_eq!(cfg.otp_ttl_minutes, 10);
    assert!(cfg.cloudinary.is_none());
  }
}
