// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::collections::BTreeMap;
use storeflow::FlowError;
use thiserror::Error;

/// Field-level validation messages, rendered as `{"errors": {field: [msg]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
  pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationFailure {
  pub fn field(field: &str, message: impl Into<String>) -> Self {
    let mut failure = Self::default();
    failure.add(field, message);
    failure
  }

  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.errors.entry(field.to_string()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.errors.is_empty()
  }

  /// The first message, used as the top-level `error` text.
  pub fn first_message(&self) -> &str {
    self
      .errors
      .values()
      .flat_map(|messages| messages.iter())
      .next()
      .map(String::as_str)
      .unwrap_or("The given data was invalid.")
  }

  /// `Err` with the collected messages, `Ok` when nothing was added.
  pub fn into_result(self) -> Result<()> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(AppError::Validation(self))
    }
  }
}

impl std::fmt::Display for ValidationFailure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.first_message())
  }
}

impl From<validator::ValidationErrors> for ValidationFailure {
  fn from(errors: validator::ValidationErrors) -> Self {
    let mut failure = ValidationFailure::default();
    for (field, field_errors) in errors.field_errors() {
      for err in field_errors.iter() {
        let message = match &err.message {
          Some(message) => message.to_string(),
          None => format!("The {} field is invalid.", field.replace('_', " ")),
        };
        failure.add(&field, message);
      }
    }
    failure
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(ValidationFailure),

  #[error("{0}")]
  BadRequest(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Payload Too Large: {0}")]
  PayloadTooLarge(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(sqlx::Error),

  #[error("Flow Error: {source}")]
  Flow {
    #[from]
    source: FlowError,
  },

  #[error("Failed to upload image: {0}")]
  Upload(String),

  #[error("Mail Error: {0}")]
  Mail(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn validation(field: &str, message: impl Into<String>) -> Self {
    AppError::Validation(ValidationFailure::field(field, message))
  }

  /// True for failures the client caused (4xx).
  pub fn is_client_error(&self) -> bool {
    self.status_code().is_client_error()
  }
}

impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    match err {
      sqlx::Error::RowNotFound => AppError::NotFound("The requested record does not exist.".to_string()),
      other => AppError::Sqlx(other),
    }
  }
}

impl From<validator::ValidationErrors> for AppError {
  fn from(errors: validator::ValidationErrors) -> Self {
    AppError::Validation(errors.into())
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<sqlx::Error>() {
        Ok(sqlx_err) => AppError::from(sqlx_err),
        Err(err) => AppError::Internal(err.to_string()),
      },
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Flow { .. }
      | AppError::Upload(_)
      | AppError::Mail(_)
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::debug!(application_error = %self, status = status.as_u16(), "Responding with client error");
    }

    let body = match self {
      AppError::Validation(failure) => json!({
        "success": false,
        "error": failure.first_message(),
        "errors": failure.errors,
      }),
      AppError::BadRequest(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::PayloadTooLarge(m) => {
        json!({"success": false, "error": m})
      }
      AppError::Upload(m) => json!({"success": false, "error": format!("Failed to upload image: {}", m)}),
      AppError::Config(_) => json!({"success": false, "error": "Service is not configured correctly."}),
      AppError::Sqlx(_) => json!({"success": false, "error": "Database operation failed."}),
      AppError::Flow { .. } => json!({"success": false, "error": "Request processing failed."}),
      AppError::Mail(m) | AppError::Internal(m) => json!({"success": false, "error": m}),
    };
    HttpResponse::build(status).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
