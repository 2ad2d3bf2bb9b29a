// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use storeflow::Shared;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use super::run_flow;
use crate::errors::AppError;
use crate::flows::contexts::AddToCartCtx;
use crate::models::{Cart, CartItem, CartLine};
use crate::services::pricing;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;
use crate::web::payloads::{AddToCartRequest, UpdateCartRequest};

const CART_LINE_COLUMNS: &str = "ci.id, ci.product_id, ci.quantity, ci.price_cents, p.name AS product_name, \
   p.slug AS product_slug, p.image_url AS product_image_url, p.stock AS product_stock";

/// Lines of the user's cart with their total and item count.
pub async fn cart_summary(pool: &PgPool, user_id: Uuid) -> Result<(Vec<CartLine>, i64, i64), AppError> {
  let lines: Vec<CartLine> = sqlx::query_as(&format!(
    "SELECT {} FROM cart_items ci \
     JOIN carts c ON c.id = ci.cart_id \
     JOIN products p ON p.id = ci.product_id \
     WHERE c.user_id = $1 ORDER BY ci.created_at, ci.id",
    CART_LINE_COLUMNS
  ))
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  let total = pricing::price_lines(&lines, 0)?.subtotal_cents;
  let count = lines.iter().map(|l| i64::from(l.quantity)).sum();
  Ok((lines, total, count))
}

/// Ownership and stock of one cart line.
#[derive(Debug, FromRow)]
struct OwnedLine {
  id: Uuid,
  owner_id: Uuid,
  product_stock: i32,
}

async fn owned_line(pool: &PgPool, item_id: Uuid, user_id: Uuid) -> Result<OwnedLine, AppError> {
  let line: OwnedLine = sqlx::query_as(
    "SELECT ci.id, c.user_id AS owner_id, p.stock AS product_stock \
     FROM cart_items ci JOIN carts c ON c.id = ci.cart_id JOIN products p ON p.id = ci.product_id \
     WHERE ci.id = $1",
  )
  .bind(item_id)
  .fetch_optional(pool)
  .await?
  .ok_or_else(|| AppError::NotFound("Cart item not found.".to_string()))?;

  if line.owner_id != user_id {
    warn!(%item_id, %user_id, "Cart item belongs to another user.");
    return Err(AppError::Forbidden("Unauthorized".to_string()));
  }
  Ok(line)
}

#[instrument(name = "handler::get_cart", skip_all, fields(user_id = %auth.user.id))]
pub async fn get_cart_handler(app_state: web::Data<AppState>, auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let cart: Option<Cart> = sqlx::query_as("SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1")
    .bind(auth.user.id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  if cart.is_none() {
    return Ok(HttpResponse::Ok().json(json!({"items": [], "total": 0, "count": 0})));
  }

  let (items, total, count) = cart_summary(&app_state.db_pool, auth.user.id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "items": items,
    "total": total,
    "count": count,
  })))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, payload, auth),
  fields(user_id = %auth.user.id, product_id = %payload.product_id, quantity = payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<AddToCartRequest>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(AddToCartCtx {
    app_state: app_state.get_ref().clone(),
    user_id: auth.user.id,
    product_id: payload.product_id,
    quantity: payload.quantity,
    product: None,
    cart_id: None,
    cart_count: 0,
  });
  run_flow(&app_state, &ctx).await?;

  let cart_count = ctx.read().cart_count;
  info!(cart_count, "Product added to cart.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Product added to cart.",
    "cart_count": cart_count,
  })))
}

#[instrument(name = "handler::update_cart_item", skip(app_state, payload, auth), fields(user_id = %auth.user.id))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<UpdateCartRequest>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  payload.validate()?;
  let line = owned_line(&app_state.db_pool, path.into_inner(), auth.user.id).await?;
  if line.product_stock < payload.quantity {
    return Err(AppError::BadRequest(crate::flows::cart_flow::INSUFFICIENT_STOCK.to_string()));
  }

  let item: CartItem = sqlx::query_as(
    "UPDATE cart_items SET quantity = $1, updated_at = NOW() WHERE id = $2 \
     RETURNING id, cart_id, product_id, quantity, price_cents, created_at, updated_at",
  )
  .bind(payload.quantity)
  .bind(line.id)
  .fetch_one(&app_state.db_pool)
  .await?;
  info!(item_id = %item.id, quantity = item.quantity, "Cart item updated.");

  let (_, total, count) = cart_summary(&app_state.db_pool, auth.user.id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "cart_count": count,
    "total": total,
  })))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let line = owned_line(&app_state.db_pool, path.into_inner(), auth.user.id).await?;
  sqlx::query("DELETE FROM cart_items WHERE id = $1")
    .bind(line.id)
    .execute(&app_state.db_pool)
    .await?;
  info!(item_id = %line.id, "Cart item removed.");

  let (_, total, count) = cart_summary(&app_state.db_pool, auth.user.id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Product removed from cart.",
    "cart_count": count,
    "total": total,
  })))
}
