// storefront/src/web/handlers/password_handlers.rs

//! Forgot-password endpoints: send a code, check it, then reset.

use actix_web::{web, HttpResponse};
use serde_json::json;
use storeflow::Shared;
use tracing::{info, instrument};

use super::run_flow;
use crate::errors::AppError;
use crate::flows::contexts::{ResetPasswordCtx, SendOtpCtx, VerifyOtpCtx};
use crate::state::AppState;
use crate::web::payloads::{ResetPasswordRequest, SendOtpRequest, VerifyOtpRequest};

#[instrument(name = "handler::send_otp", skip(app_state, payload), fields(email = %payload.email))]
pub async fn send_otp_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SendOtpRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(SendOtpCtx {
    app_state: app_state.get_ref().clone(),
    input: payload.into_inner(),
    user: None,
    otp: None,
  });
  run_flow(&app_state, &ctx).await?;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "OTP has been sent to your email.",
  })))
}

#[instrument(name = "handler::verify_otp", skip(app_state, payload), fields(email = %payload.email))]
pub async fn verify_otp_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(VerifyOtpCtx {
    app_state: app_state.get_ref().clone(),
    input: payload.into_inner(),
  });
  run_flow(&app_state, &ctx).await?;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "OTP verified successfully.",
  })))
}

#[instrument(name = "handler::reset_password", skip(app_state, payload), fields(email = %payload.email))]
pub async fn reset_password_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(ResetPasswordCtx {
    app_state: app_state.get_ref().clone(),
    input: payload.into_inner(),
    revoked_tokens: 0,
  });
  run_flow(&app_state, &ctx).await?;
  info!(revoked_tokens = ctx.read().revoked_tokens, "Password reset.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Password reset successfully!",
  })))
}
