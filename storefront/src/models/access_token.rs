// storefront/src/models/access_token.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A bearer token. Only the SHA-256 of the secret half is stored.
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
  pub id: Uuid,
  pub user_id: Uuid,
  pub name: String,
  pub token_hash: String,
  pub last_used_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}
