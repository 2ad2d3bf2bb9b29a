// storefront/src/services/auth_service.rs

//! Password hashing and bearer-token handling.
//!
//! A token is handed out once as `"<token id>|<secret>"`. The database keeps
//! the token id and the SHA-256 of the secret, so a leaked table does not
//! leak usable credentials.

use crate::errors::AppError;
use crate::models::{AccessToken, User};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

const TOKEN_SECRET_LEN: usize = 40;

/// Hashes a plain-text password with Argon2 and a random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::validation("password", "The password field is required."));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// `Ok(false)` on a mismatch; `Err` only when the stored hash is unusable.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

pub fn hash_token_secret(secret: &str) -> String {
  hex::encode(Sha256::digest(secret.as_bytes()))
}

fn generate_token_secret() -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(TOKEN_SECRET_LEN)
    .map(char::from)
    .collect()
}

/// Splits `"<uuid>|<secret>"`. Anything else is rejected.
pub fn parse_plain_token(plain: &str) -> Option<(Uuid, &str)> {
  let (id, secret) = plain.trim().split_once('|')?;
  if secret.is_empty() {
    return None;
  }
  let id = Uuid::parse_str(id).ok()?;
  Some((id, secret))
}

/// Pulls the token out of an `Authorization: Bearer ...` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
  let (scheme, token) = header_value.trim().split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return None;
  }
  let token = token.trim();
  (!token.is_empty()).then_some(token)
}

/// Creates a token for `user_id` and returns its plain form. This is the
/// only time the secret is available.
#[instrument(name = "auth_service::issue_token", skip(executor), err(Display))]
pub async fn issue_token<'e, E>(executor: E, user_id: Uuid, name: &str) -> Result<String, AppError>
where
  E: PgExecutor<'e>,
{
  let secret = generate_token_secret();
  let token_id: Uuid =
    sqlx::query_scalar("INSERT INTO access_tokens (user_id, name, token_hash) VALUES ($1, $2, $3) RETURNING id")
      .bind(user_id)
      .bind(name)
      .bind(hash_token_secret(&secret))
      .fetch_one(executor)
      .await?;
  Ok(format!("{}|{}", token_id, secret))
}

/// Resolves a plain token to its owner and records the use.
#[instrument(name = "auth_service::authenticate", skip_all, err(Display))]
pub async fn authenticate(pool: &PgPool, plain_token: &str) -> Result<(User, Uuid), AppError> {
  let unauthenticated = || AppError::Auth("Unauthenticated.".to_string());
  let (token_id, secret) = parse_plain_token(plain_token).ok_or_else(unauthenticated)?;

  let token: Option<AccessToken> = sqlx::query_as(
    "SELECT id, user_id, name, token_hash, last_used_at, created_at FROM access_tokens WHERE id = $1",
  )
  .bind(token_id)
  .fetch_optional(pool)
  .await?;

  let Some(token) = token else {
    debug!(%token_id, "Unknown access token.");
    return Err(unauthenticated());
  };
  if token.token_hash != hash_token_secret(secret) {
    warn!(%token_id, "Access token secret mismatch.");
    return Err(unauthenticated());
  }

  sqlx::query("UPDATE access_tokens SET last_used_at = NOW() WHERE id = $1")
    .bind(token.id)
    .execute(pool)
    .await?;

  let user: User = sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", User::COLUMNS))
    .bind(token.user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(unauthenticated)?;

  Ok((user, token.id))
}

pub async fn revoke_token<'e, E>(executor: E, token_id: Uuid) -> Result<(), AppError>
where
  E: PgExecutor<'e>,
{
  sqlx::query("DELETE FROM access_tokens WHERE id = $1")
    .bind(token_id)
    .execute(executor)
    .await?;
  Ok(())
}

pub async fn revoke_all_tokens<'e, E>(executor: E, user_id: Uuid) -> Result<u64, AppError>
where
  E: PgExecutor<'e>,
{
  let result = sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
    .bind(user_id)
    .execute(executor)
    .await?;
  Ok(result.rows_affected())
}
