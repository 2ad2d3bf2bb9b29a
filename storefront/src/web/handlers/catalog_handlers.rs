// storefront/src/web/handlers/catalog_handlers.rs

//! Public catalog: products and categories.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Category, Product, ProductWithCategory};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
  pub filter: Option<String>,
  pub search: Option<String>,
}

/// `%term%` for `ILIKE`, with the pattern characters in `term` escaped.
pub fn contains_pattern(term: &str) -> String {
  let mut pattern = String::with_capacity(term.len() + 2);
  pattern.push('%');
  for c in term.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

/// Attaches each product's category, loaded in one query.
pub async fn with_categories(pool: &PgPool, products: Vec<Product>) -> Result<Vec<ProductWithCategory>, AppError> {
  let mut ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();
  ids.sort_unstable();
  ids.dedup();

  let categories: Vec<Category> = sqlx::query_as(&format!(
    "SELECT {} FROM categories WHERE id = ANY($1)",
    Category::COLUMNS
  ))
  .bind(&ids)
  .fetch_all(pool)
  .await?;
  let by_id: HashMap<Uuid, Category> = categories.into_iter().map(|c| (c.id, c)).collect();

  Ok(
    products
      .into_iter()
      .map(|product| {
        let category = by_id.get(&product.category_id).cloned();
        ProductWithCategory { product, category }
      })
      .collect(),
  )
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<CatalogQuery>,
) -> Result<HttpResponse, AppError> {
  let pool = &app_state.db_pool;

  // An unknown category slug does not restrict the listing.
  let category_id: Option<Uuid> = match query.filter.as_deref().filter(|f| !f.is_empty()) {
    Some(slug) => sqlx::query_scalar("SELECT id FROM categories WHERE slug = $1")
      .bind(slug)
      .fetch_optional(pool)
      .await?,
    None => None,
  };
  let pattern = query
    .search
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(contains_pattern);

  let products: Vec<Product> = sqlx::query_as(&format!(
    "SELECT {} FROM products \
     WHERE ($1::uuid IS NULL OR category_id = $1) \
       AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2) \
     ORDER BY created_at, name",
    Product::COLUMNS
  ))
  .bind(category_id)
  .bind(pattern)
  .fetch_all(pool)
  .await?;
  debug!(count = products.len(), "Products listed.");

  let products = with_categories(pool, products).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "total": products.len(),
    "products": products,
  })))
}

/// A UUID looks up by id, anything else by slug.
#[instrument(name = "handler::get_product", skip(app_state))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let key = path.into_inner();
  let query = match Uuid::parse_str(&key) {
    Ok(id) => sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE id = $1", Product::COLUMNS))
      .bind(id)
      .fetch_optional(&app_state.db_pool)
      .await?,
    Err(_) => sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE slug = $1", Product::COLUMNS))
      .bind(&key)
      .fetch_optional(&app_state.db_pool)
      .await?,
  };
  let product = query.ok_or_else(|| AppError::NotFound("Product not found.".to_string()))?;

  let product = with_categories(&app_state.db_pool, vec![product])
    .await?
    .pop()
    .ok_or_else(|| AppError::Internal("Product lookup lost its row.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "product": product,
  })))
}

pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories: Vec<Category> = sqlx::query_as(&format!("SELECT {} FROM categories ORDER BY name", Category::COLUMNS))
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "total": categories.len(),
    "categories": categories,
  })))
}

pub async fn get_category_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let key = path.into_inner();
  let category: Option<Category> = match Uuid::parse_str(&key) {
    Ok(id) => sqlx::query_as(&format!("SELECT {} FROM categories WHERE id = $1", Category::COLUMNS))
      .bind(id)
      .fetch_optional(&app_state.db_pool)
      .await?,
    Err(_) => sqlx::query_as(&format!("SELECT {} FROM categories WHERE slug = $1", Category::COLUMNS))
      .bind(&key)
      .fetch_optional(&app_state.db_pool)
      .await?,
  };
  let category = category.ok_or_else(|| AppError::NotFound("Category not found.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "category": category,
  })))
}
