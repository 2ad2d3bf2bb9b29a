// storefront/src/flows/signin_flow.rs

use crate::errors::AppError;
use crate::flows::contexts::SigninCtx;
use crate::models::User;
use crate::services::auth_service;
use storeflow::{Control, Flow, Registry, Shared};
use tracing::{info, warn};
use validator::Validate;

pub const BAD_CREDENTIALS: &str = "The provided credentials do not match our records.";

pub fn register_signin_flow(registry: &Registry<AppError>) {
  let mut flow = Flow::<SigninCtx, AppError>::new(
    "signin",
    &["validate_signin_input", "find_user", "verify_password", "issue_token"],
  );

  flow.on("validate_signin_input", |ctx: Shared<SigninCtx>| async move {
    ctx.read().input.validate()?;
    Ok::<_, AppError>(Control::Continue)
  });
  flow.on("find_user", find_user);
  flow.on("verify_password", verify_password);
  flow.on("issue_token", issue_token);

  registry.register(flow);
}

async fn find_user(ctx: Shared<SigninCtx>) -> Result<Control, AppError> {
  let (email, pool) = {
    let guard = ctx.read();
    (guard.input.email.clone(), guard.app_state.db_pool.clone())
  };

  let user: Option<User> = sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", User::COLUMNS))
    .bind(&email)
    .fetch_optional(&pool)
    .await?;
  match user {
    Some(user) => {
      ctx.write().user = Some(user);
      Ok(Control::Continue)
    }
    None => {
      warn!(%email, "Sign-in for unknown email.");
      Err(AppError::Auth(BAD_CREDENTIALS.to_string()))
    }
  }
}

async fn verify_password(ctx: Shared<SigninCtx>) -> Result<Control, AppError> {
  let matches = {
    let guard = ctx.read();
    let user = guard.user.as_ref().ok_or_else(|| AppError::Auth(BAD_CREDENTIALS.to_string()))?;
    auth_service::verify_password(&user.password_hash, &guard.input.password)?
  };
  if !matches {
    warn!("Sign-in with a wrong password.");
    return Err(AppError::Auth(BAD_CREDENTIALS.to_string()));
  }
  Ok(Control::Continue)
}

async fn issue_token(ctx: Shared<SigninCtx>) -> Result<Control, AppError> {
  let (user_id, pool) = {
    let guard = ctx.read();
    let user = guard.user.as_ref().ok_or_else(|| AppError::Auth(BAD_CREDENTIALS.to_string()))?;
    (user.id, guard.app_state.db_pool.clone())
  };

  let token = auth_service::issue_token(&pool, user_id, "auth_token").await?;
  info!(%user_id, "User signed in.");
  ctx.write().token = Some(token);
  Ok(Control::Continue)
}
