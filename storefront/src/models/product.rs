// storefront/src/models/product.rs

use super::Category;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
  pub category_id: Uuid,
  pub price_cents: i64,
  pub description: Option<String>,
  pub details: Option<String>,
  pub image_url: Option<String>,
  #[serde(skip_serializing)]
  pub image_public_id: Option<String>,
  pub stock: i32,
  pub featured: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub const COLUMNS: &'static str = "id, name, slug, category_id, price_cents, description, details, image_url, \
     image_public_id, stock, featured, created_at, updated_at";
}

/// A product as the catalog returns it, with its category embedded.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithCategory {
  #[serde(flatten)]
  pub product: Product,
  pub category: Option<Category>,
}
