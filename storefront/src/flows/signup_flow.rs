// storefront/src/flows/signup_flow.rs

use crate::db::is_unique_violation;
use crate::errors::AppError;
use crate::flows::contexts::SignupCtx;
use crate::models::User;
use crate::services::auth_service;
use storeflow::{Control, Flow, Registry, Shared};
use tracing::{info, instrument, warn};
use validator::Validate;

const EMAIL_TAKEN: &str = "This email is already registered.";

pub fn register_signup_flow(registry: &Registry<AppError>) {
  let mut flow = Flow::<SignupCtx, AppError>::new(
    "signup",
    &["validate_signup_input", "check_existing_email", "create_user", "issue_token"],
  );

  flow.on("validate_signup_input", validate_signup_input);
  flow.on("check_existing_email", check_existing_email);
  flow.on("create_user", create_user);
  flow.on("issue_token", issue_token);

  registry.register(flow);
}

async fn validate_signup_input(ctx: Shared<SignupCtx>) -> Result<Control, AppError> {
  ctx.read().input.validate()?;
  Ok(Control::Continue)
}

async fn check_existing_email(ctx: Shared<SignupCtx>) -> Result<Control, AppError> {
  let (email, pool) = {
    let guard = ctx.read();
    (guard.input.email.clone(), guard.app_state.db_pool.clone())
  };

  let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
    .bind(&email)
    .fetch_one(&pool)
    .await?;
  if exists {
    warn!(%email, "Sign-up attempted with a registered email.");
    return Err(AppError::validation("email", EMAIL_TAKEN));
  }
  Ok(Control::Continue)
}

#[instrument(name = "signup::create_user", skip_all, err(Display))]
async fn create_user(ctx: Shared<SignupCtx>) -> Result<Control, AppError> {
  let (input, pool) = {
    let guard = ctx.read();
    (guard.input.clone(), guard.app_state.db_pool.clone())
  };

  let password_hash = auth_service::hash_password(&input.password)?;
  let user: User = sqlx::query_as(&format!(
    "INSERT INTO users (first_name, last_name, email, phone, password_hash) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
    User::COLUMNS
  ))
  .bind(input.first_name.trim())
  .bind(input.last_name.trim())
  .bind(&input.email)
  .bind(&input.phone)
  .bind(password_hash)
  .fetch_one(&pool)
  .await
  .map_err(|e| {
    if is_unique_violation(&e) {
      AppError::validation("email", EMAIL_TAKEN)
    } else {
      AppError::from(e)
    }
  })?;

  info!(user_id = %user.id, "User created.");
  ctx.write().user = Some(user);
  Ok(Control::Continue)
}

async fn issue_token(ctx: Shared<SignupCtx>) -> Result<Control, AppError> {
  let (user_id, pool) = {
    let guard = ctx.read();
    let user = guard
      .user
      .as_ref()
      .ok_or_else(|| AppError::Internal("Sign-up reached token issue without a user.".to_string()))?;
    (user.id, guard.app_state.db_pool.clone())
  };

  let token = auth_service::issue_token(&pool, user_id, "auth_token").await?;
  ctx.write().token = Some(token);
  Ok(Control::Continue)
}
