// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use storeflow::Shared;
use tracing::{info, instrument, warn};

use super::run_flow;
use crate::errors::AppError;
use crate::flows::contexts::{SigninCtx, SignupCtx};
use crate::services::auth_service;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;
use crate::web::payloads::{LoginRequest, RegisterRequest};

#[instrument(name = "handler::register", skip(app_state, payload), fields(email = %payload.email))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(SignupCtx {
    app_state: app_state.get_ref().clone(),
    input: payload.into_inner(),
    user: None,
    token: None,
  });
  run_flow(&app_state, &ctx).await?;

  let guard = ctx.read();
  let (Some(user), Some(token)) = (guard.user.as_ref(), guard.token.as_ref()) else {
    warn!("Sign-up completed without a user or token.");
    return Err(AppError::Internal("Sign-up completed without creating the account.".to_string()));
  };
  info!(user_id = %user.id, "Account created.");

  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Account created successfully!",
    "user": user,
    "token": token,
  })))
}

#[instrument(name = "handler::login", skip(app_state, payload), fields(email = %payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(SigninCtx {
    app_state: app_state.get_ref().clone(),
    input: payload.into_inner(),
    user: None,
    token: None,
  });
  run_flow(&app_state, &ctx).await?;

  let guard = ctx.read();
  let (Some(user), Some(token)) = (guard.user.as_ref(), guard.token.as_ref()) else {
    warn!("Sign-in completed without a user or token.");
    return Err(AppError::Internal("Sign-in completed without a session token.".to_string()));
  };
  info!(user_id = %user.id, "User logged in.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Logged in successfully!",
    "user": user,
    "token": token,
  })))
}

#[instrument(name = "handler::logout", skip_all, fields(user_id = %auth.user.id))]
pub async fn logout_handler(app_state: web::Data<AppState>, auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  auth_service::revoke_token(&app_state.db_pool, auth.token_id).await?;
  info!("Access token revoked.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Logged out successfully!",
  })))
}

pub async fn current_user_handler(auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "user": auth.user,
  })))
}
