// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "user_role_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
  Customer,
  Admin,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: Option<String>,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role: UserRole,
  pub avatar_url: Option<String>,
  #[serde(skip_serializing)]
  pub avatar_public_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub const COLUMNS: &'static str =
    "id, first_name, last_name, email, phone, password_hash, role, avatar_url, avatar_public_id, created_at, updated_at";

  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name).trim().to_string()
  }

  pub fn is_admin(&self) -> bool {
    self.role == UserRole::Admin
  }
}
