// storefront/src/web/handlers/admin_product_handlers.rs

//! Product management for admins. Create and update take a multipart form
//! and run the `save_product` flow.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use storeflow::Shared;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::catalog_handlers::with_categories;
use super::run_flow;
use crate::errors::AppError;
use crate::flows::contexts::{ProductForm, SaveProductCtx};
use crate::models::{Product, ProductWithCategory};
use crate::services::media::destroy_quietly;
use crate::state::AppState;
use crate::web::auth::AdminUser;
use crate::web::multipart::{parse_form, read_body, FormData};
use crate::web::routes::MAX_BODY_BYTES;

fn product_form(form: &FormData) -> ProductForm {
  ProductForm {
    name: form.text("name"),
    price: form.text("price"),
    category_id: form.text("category_id"),
    description: form.text("description"),
    details: form.text("details"),
    stock: form.text("stock"),
    featured: form.flag("featured"),
  }
}

async fn save_product(
  app_state: &AppState,
  product_id: Option<Uuid>,
  req: &HttpRequest,
  payload: web::Payload,
) -> Result<ProductWithCategory, AppError> {
  let mut form = parse_form(req, read_body(payload, MAX_BODY_BYTES).await?).await?;
  let ctx = Shared::new(SaveProductCtx {
    app_state: app_state.clone(),
    product_id,
    form: product_form(&form),
    image: form.take_file("image"),
    fields: None,
    existing: None,
    uploaded: None,
    slug: None,
    saved: None,
  });
  run_flow(app_state, &ctx).await?;

  let saved = ctx.write().saved.take();
  let product = saved.ok_or_else(|| AppError::Internal("Product flow completed without saving.".to_string()))?;
  with_categories(&app_state.db_pool, vec![product])
    .await?
    .pop()
    .ok_or_else(|| AppError::Internal("Saved product lost its row.".to_string()))
}

async fn find_product(app_state: &AppState, product_id: Uuid) -> Result<Product, AppError> {
  sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", Product::COLUMNS))
    .bind(product_id)
    .fetch_optional(&app_state.db_pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found.".to_string()))
}

#[instrument(name = "handler::admin_list_products", skip_all, fields(admin_id = %admin.0.user.id))]
pub async fn list_products_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let products: Vec<Product> = sqlx::query_as(&format!(
    "SELECT {} FROM products ORDER BY created_at DESC",
    Product::COLUMNS
  ))
  .fetch_all(&app_state.db_pool)
  .await?;

  let products = with_categories(&app_state.db_pool, products).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "total": products.len(),
    "products": products,
  })))
}

pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product = find_product(&app_state, path.into_inner()).await?;
  let product = with_categories(&app_state.db_pool, vec![product])
    .await?
    .pop()
    .ok_or_else(|| AppError::Internal("Product lookup lost its row.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "product": product,
  })))
}

#[instrument(name = "handler::admin_create_product", skip_all, fields(admin_id = %admin.0.user.id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  payload: web::Payload,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product = save_product(&app_state, None, &req, payload).await?;
  info!(product_id = %product.product.id, "Product created.");
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Product created successfully!",
    "product": product,
  })))
}

#[instrument(name = "handler::admin_update_product", skip(app_state, req, payload, admin), fields(admin_id = %admin.0.user.id))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req: HttpRequest,
  payload: web::Payload,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product = save_product(&app_state, Some(path.into_inner()), &req, payload).await?;
  info!(product_id = %product.product.id, "Product updated.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Product updated successfully!",
    "product": product,
  })))
}

#[instrument(name = "handler::admin_delete_product", skip(app_state, admin), fields(admin_id = %admin.0.user.id))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product = find_product(&app_state, path.into_inner()).await?;
  destroy_quietly(app_state.media.as_ref(), product.image_public_id.as_deref()).await;

  let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
    .bind(product.id)
    .execute(&app_state.db_pool)
    .await?;
  if deleted.rows_affected() == 0 {
    warn!(product_id = %product.id, "Product vanished before delete.");
    return Err(AppError::NotFound("Product not found.".to_string()));
  }
  info!(product_id = %product.id, "Product deleted.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Product deleted successfully!",
  })))
}
