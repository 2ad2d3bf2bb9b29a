// storefront/src/models/cart.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Cart {
  pub id: Uuid,
  pub user_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartItem {
  pub id: Uuid,
  pub cart_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  /// Price captured when the line was first added.
  pub price_cents: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A cart line joined with the product it points at.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
  pub id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_cents: i64,
  pub product_name: String,
  pub product_slug: String,
  pub product_image_url: Option<String>,
  pub product_stock: i32,
}
