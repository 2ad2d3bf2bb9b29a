// storefront/src/flows/password_reset_flow.rs

//! Forgotten-password handling: mail a one-time code, check it, and swap the
//! password once the code is proven.

use crate::errors::AppError;
use crate::flows::contexts::{ResetPasswordCtx, SendOtpCtx, VerifyOtpCtx};
use crate::models::{PasswordReset, User};
use crate::services::{auth_service, mail, otp};
use chrono::Utc;
use sqlx::PgPool;
use storeflow::{Control, Flow, Registry, Shared};
use tracing::{error, info, instrument, warn};
use validator::Validate;

pub const EMAIL_NOT_REGISTERED: &str = "This email is not registered in our system.";
pub const OTP_SEND_FAILED: &str = "Failed to send OTP email.";
pub const OTP_INVALID: &str = "Invalid OTP code. Please try again.";
pub const OTP_EXPIRED: &str = "OTP has expired. Please request a new one.";
pub const OTP_RESET_REJECTED: &str = "Invalid or expired OTP. Please start over.";

pub fn register_password_reset_flows(registry: &Registry<AppError>) {
  let mut send = Flow::<SendOtpCtx, AppError>::new(
    "send_otp",
    &["validate_email", "find_user", "store_otp", "send_otp_mail"],
  );
  send.on("validate_email", |ctx: Shared<SendOtpCtx>| async move {
    ctx.read().input.validate()?;
    Ok::<_, AppError>(Control::Continue)
  });
  send.on("find_user", find_user);
  send.on("store_otp", store_otp);
  send.on("send_otp_mail", send_otp_mail);
  registry.register(send);

  let mut verify = Flow::<VerifyOtpCtx, AppError>::new("verify_otp", &["validate_otp_input", "check_code"]);
  verify.on("validate_otp_input", |ctx: Shared<VerifyOtpCtx>| async move {
    ctx.read().input.validate()?;
    Ok::<_, AppError>(Control::Continue)
  });
  verify.on("check_code", check_code);
  registry.register(verify);

  let mut reset = Flow::<ResetPasswordCtx, AppError>::new(
    "reset_password",
    &["validate_reset_input", "check_live_code", "replace_password"],
  );
  reset.on("validate_reset_input", |ctx: Shared<ResetPasswordCtx>| async move {
    ctx.read().input.validate()?;
    Ok::<_, AppError>(Control::Continue)
  });
  reset.on("check_live_code", check_live_code);
  reset.on("replace_password", replace_password);
  registry.register(reset);
}

async fn latest_code(pool: &PgPool, email: &str, code: &str) -> Result<Option<PasswordReset>, AppError> {
  let reset = sqlx::query_as(
    "SELECT id, email, otp, expires_at, created_at FROM password_resets \
     WHERE email = $1 AND otp = $2 ORDER BY created_at DESC LIMIT 1",
  )
  .bind(email)
  .bind(code)
  .fetch_optional(pool)
  .await?;
  Ok(reset)
}

async fn find_user(ctx: Shared<SendOtpCtx>) -> Result<Control, AppError> {
  let (email, pool) = {
    let guard = ctx.read();
    (guard.input.email.clone(), guard.app_state.db_pool.clone())
  };

  let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", User::COLUMNS))
    .bind(&email)
    .fetch_optional(&pool)
    .await?;
  let user = user.ok_or_else(|| AppError::validation("email", EMAIL_NOT_REGISTERED))?;
  ctx.write().user = Some(user);
  Ok(Control::Continue)
}

/// Replaces any earlier code for the address with a fresh one.
async fn store_otp(ctx: Shared<SendOtpCtx>) -> Result<Control, AppError> {
  let (email, pool, ttl_minutes) = {
    let guard = ctx.read();
    (
      guard.input.email.clone(),
      guard.app_state.db_pool.clone(),
      guard.app_state.config.otp_ttl_minutes,
    )
  };

  let code = otp::generate_otp();
  let mut tx = pool.begin().await?;
  sqlx::query("DELETE FROM password_resets WHERE email = $1")
    .bind(&email)
    .execute(&mut *tx)
    .await?;
  sqlx::query("INSERT INTO password_resets (email, otp, expires_at) VALUES ($1, $2, $3)")
    .bind(&email)
    .bind(&code)
    .bind(otp::expiry_from(Utc::now(), ttl_minutes))
    .execute(&mut *tx)
    .await?;
  tx.commit().await?;

  ctx.write().otp = Some(code);
  Ok(Control::Continue)
}

#[instrument(name = "password_reset::send_otp_mail", skip_all, err(Display))]
async fn send_otp_mail(ctx: Shared<SendOtpCtx>) -> Result<Control, AppError> {
  let (message, mailer) = {
    let guard = ctx.read();
    let user = guard
      .user
      .as_ref()
      .ok_or_else(|| AppError::Internal("OTP mail without a user.".to_string()))?;
    let code = guard
      .otp
      .as_deref()
      .ok_or_else(|| AppError::Internal("OTP mail without a code.".to_string()))?;
    (
      mail::otp_mail(&user.email, &user.full_name(), code, guard.app_state.config.otp_ttl_minutes),
      guard.app_state.mailer.clone(),
    )
  };

  if let Err(e) = mailer.send(message).await {
    error!(error = %e, "OTP mail could not be delivered.");
    return Err(AppError::Mail(OTP_SEND_FAILED.to_string()));
  }
  info!("OTP mail sent.");
  Ok(Control::Continue)
}

async fn check_code(ctx: Shared<VerifyOtpCtx>) -> Result<Control, AppError> {
  let (email, code, pool) = {
    let guard = ctx.read();
    (guard.input.email.clone(), guard.input.otp.clone(), guard.app_state.db_pool.clone())
  };

  let reset = latest_code(&pool, &email, &code)
    .await?
    .ok_or_else(|| AppError::BadRequest(OTP_INVALID.to_string()))?;

  if reset.is_expired_at(Utc::now()) {
    warn!(%email, "Expired OTP presented.");
    sqlx::query("DELETE FROM password_resets WHERE id = $1")
      .bind(reset.id)
      .execute(&pool)
      .await?;
    return Err(AppError::BadRequest(OTP_EXPIRED.to_string()));
  }
  Ok(Control::Continue)
}

async fn check_live_code(ctx: Shared<ResetPasswordCtx>) -> Result<Control, AppError> {
  let (email, code, pool) = {
    let guard = ctx.read();
    (guard.input.email.clone(), guard.input.otp.clone(), guard.app_state.db_pool.clone())
  };

  match latest_code(&pool, &email, &code).await? {
    Some(reset) if !reset.is_expired_at(Utc::now()) => Ok(Control::Continue),
    _ => Err(AppError::BadRequest(OTP_RESET_REJECTED.to_string())),
  }
}

/// Stores the new hash, burns the codes and signs the user out everywhere,
/// in one transaction.
#[instrument(name = "password_reset::replace_password", skip_all, err(Display))]
async fn replace_password(ctx: Shared<ResetPasswordCtx>) -> Result<Control, AppError> {
  let (email, password, pool) = {
    let guard = ctx.read();
    (
      guard.input.email.clone(),
      guard.input.password.clone(),
      guard.app_state.db_pool.clone(),
    )
  };

  let password_hash = auth_service::hash_password(&password)?;
  let mut tx = pool.begin().await?;
  let user_id: Option<uuid::Uuid> =
    sqlx::query_scalar("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE email = $2 RETURNING id")
      .bind(password_hash)
      .bind(&email)
      .fetch_optional(&mut *tx)
      .await?;
  let user_id = user_id.ok_or_else(|| AppError::BadRequest(OTP_RESET_REJECTED.to_string()))?;

  sqlx::query("DELETE FROM password_resets WHERE email = $1")
    .bind(&email)
    .execute(&mut *tx)
    .await?;
  let revoked = auth_service::revoke_all_tokens(&mut *tx, user_id).await?;
  tx.commit().await?;

  info!(%user_id, revoked, "Password reset completed.");
  ctx.write().revoked_tokens = revoked;
  Ok(Control::Continue)
}
