// storefront/src/web/handlers/settings_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::models::User;
use crate::services::media::{self, destroy_quietly, AVATAR_IMAGE_TYPES};
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;
use crate::web::multipart::{parse_form, read_body};
use crate::web::payloads::ProfileRequest;
use crate::web::routes::MAX_BODY_BYTES;

pub const AVATAR_FOLDER: &str = "devialet/avatars";
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

const EMAIL_TAKEN: &str = "The email has already been taken.";

#[instrument(name = "handler::update_profile", skip_all, fields(user_id = %auth.user.id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ProfileRequest>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  payload.validate()?;

  let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)")
    .bind(&payload.email)
    .bind(auth.user.id)
    .fetch_one(&app_state.db_pool)
    .await?;
  if taken {
    return Err(AppError::validation("email", EMAIL_TAKEN));
  }

  let user: User = sqlx::query_as(&format!(
    "UPDATE users SET first_name = $1, last_name = $2, email = $3, phone = $4, updated_at = NOW() \
     WHERE id = $5 RETURNING {}",
    User::COLUMNS
  ))
  .bind(payload.first_name.trim())
  .bind(payload.last_name.trim())
  .bind(&payload.email)
  .bind(&payload.phone)
  .bind(auth.user.id)
  .fetch_one(&app_state.db_pool)
  .await
  .map_err(|e| {
    if is_unique_violation(&e) {
      AppError::validation("email", EMAIL_TAKEN)
    } else {
      AppError::from(e)
    }
  })?;
  info!("Profile updated.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Profile updated successfully",
    "user": user,
  })))
}

#[instrument(name = "handler::update_avatar", skip_all, fields(user_id = %auth.user.id))]
pub async fn update_avatar_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: web::Payload,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let mut form = parse_form(&req, read_body(payload, MAX_BODY_BYTES).await?).await?;
  let avatar = form
    .take_file("avatar")
    .ok_or_else(|| AppError::validation("avatar", "The avatar field is required."))?;
  media::check_image(&avatar, "avatar", AVATAR_IMAGE_TYPES, MAX_AVATAR_BYTES)
    .map_err(|message| AppError::validation("avatar", message))?;

  let uploaded = app_state.media.upload(avatar, AVATAR_FOLDER).await?;
  let user: User = match sqlx::query_as(&format!(
    "UPDATE users SET avatar_url = $1, avatar_public_id = $2, updated_at = NOW() WHERE id = $3 RETURNING {}",
    User::COLUMNS
  ))
  .bind(&uploaded.secure_url)
  .bind(&uploaded.public_id)
  .bind(auth.user.id)
  .fetch_one(&app_state.db_pool)
  .await
  {
    Ok(user) => user,
    Err(e) => {
      destroy_quietly(app_state.media.as_ref(), Some(&uploaded.public_id)).await;
      return Err(e.into());
    }
  };
  destroy_quietly(app_state.media.as_ref(), auth.user.avatar_public_id.as_deref()).await;
  info!(public_id = %uploaded.public_id, "Avatar updated.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Avatar updated successfully",
    "avatar_url": user.avatar_url,
  })))
}

#[instrument(name = "handler::remove_avatar", skip_all, fields(user_id = %auth.user.id))]
pub async fn remove_avatar_handler(app_state: web::Data<AppState>, auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  if auth.user.avatar_url.is_some() || auth.user.avatar_public_id.is_some() {
    destroy_quietly(app_state.media.as_ref(), auth.user.avatar_public_id.as_deref()).await;
    sqlx::query("UPDATE users SET avatar_url = NULL, avatar_public_id = NULL, updated_at = NOW() WHERE id = $1")
      .bind(auth.user.id)
      .execute(&app_state.db_pool)
      .await?;
    info!("Avatar removed.");
  }

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Avatar removed successfully",
  })))
}
