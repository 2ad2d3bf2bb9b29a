// storefront/src/flows/cart_flow.rs

use crate::errors::AppError;
use crate::flows::contexts::AddToCartCtx;
use crate::models::Product;
use storeflow::{Control, Flow, Registry, Shared};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const INSUFFICIENT_STOCK: &str = "Insufficient stock for this product.";

pub fn register_add_to_cart_flow(registry: &Registry<AppError>) {
  let mut flow = Flow::<AddToCartCtx, AppError>::new(
    "add_to_cart",
    &["validate_cart_input", "load_product", "ensure_cart", "merge_cart_line", "count_cart_items"],
  );

  flow.on("validate_cart_input", |ctx: Shared<AddToCartCtx>| async move {
    let quantity = ctx.read().quantity;
    if quantity < 1 {
      return Err(AppError::validation("quantity", "The quantity must be at least 1."));
    }
    Ok(Control::Continue)
  });
  flow.on("load_product", load_product);
  flow.on("ensure_cart", ensure_cart);
  flow.on("merge_cart_line", merge_cart_line);
  flow.on("count_cart_items", count_cart_items);

  registry.register(flow);
}

async fn load_product(ctx: Shared<AddToCartCtx>) -> Result<Control, AppError> {
  let (product_id, quantity, pool) = {
    let guard = ctx.read();
    (guard.product_id, guard.quantity, guard.app_state.db_pool.clone())
  };

  let product: Product = sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", Product::COLUMNS))
    .bind(product_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found.".to_string()))?;

  if product.stock < quantity {
    warn!(%product_id, stock = product.stock, quantity, "Not enough stock to add to cart.");
    return Err(AppError::BadRequest(INSUFFICIENT_STOCK.to_string()));
  }
  ctx.write().product = Some(product);
  Ok(Control::Continue)
}

/// Every user has at most one cart, created on first use.
async fn ensure_cart(ctx: Shared<AddToCartCtx>) -> Result<Control, AppError> {
  let (user_id, pool) = {
    let guard = ctx.read();
    (guard.user_id, guard.app_state.db_pool.clone())
  };

  let cart_id: Uuid = sqlx::query_scalar(
    "INSERT INTO carts (user_id) VALUES ($1) \
     ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW() RETURNING id",
  )
  .bind(user_id)
  .fetch_one(&pool)
  .await?;
  ctx.write().cart_id = Some(cart_id);
  Ok(Control::Continue)
}

/// Adds the quantity to an existing line, or creates the line with the
/// current price. The combined quantity must still fit the stock. The cart
/// row is locked for the read-then-write, which also orders it against a
/// running checkout of the same cart.
#[instrument(name = "cart::merge_cart_line", skip_all, err(Display))]
async fn merge_cart_line(ctx: Shared<AddToCartCtx>) -> Result<Control, AppError> {
  let (cart_id, product, quantity, pool) = {
    let guard = ctx.read();
    let cart_id = guard
      .cart_id
      .ok_or_else(|| AppError::Internal("Cart line merge without a cart.".to_string()))?;
    let product = guard
      .product
      .clone()
      .ok_or_else(|| AppError::Internal("Cart line merge without a product.".to_string()))?;
    (cart_id, product, guard.quantity, guard.app_state.db_pool.clone())
  };

  let mut tx = pool.begin().await?;
  sqlx::query("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
    .bind(cart_id)
    .execute(&mut *tx)
    .await?;

  let existing: Option<i32> =
    sqlx::query_scalar("SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2")
      .bind(cart_id)
      .bind(product.id)
      .fetch_optional(&mut *tx)
      .await?;
  let stock: i32 = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
    .bind(product.id)
    .fetch_one(&mut *tx)
    .await?;

  let combined = merged_quantity(existing, quantity, stock)?;
  sqlx::query(
    "INSERT INTO cart_items (cart_id, product_id, quantity, price_cents) VALUES ($1, $2, $3, $4) \
     ON CONFLICT (cart_id, product_id) \
     DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()",
  )
  .bind(cart_id)
  .bind(product.id)
  .bind(combined)
  .bind(product.price_cents)
  .execute(&mut *tx)
  .await?;
  tx.commit().await?;

  info!(product_id = %product.id, quantity = combined, "Cart line saved.");
  Ok(Control::Continue)
}

/// The line's quantity after adding `added`, summed in i64 so no request
/// can wrap it. Fails when the result exceeds `stock`.
pub fn merged_quantity(existing: Option<i32>, added: i32, stock: i32) -> Result<i32, AppError> {
  let combined = i64::from(existing.unwrap_or(0)) + i64::from(added);
  if combined > i64::from(stock) {
    warn!(combined, stock, "Cart line would exceed stock.");
    return Err(AppError::BadRequest(INSUFFICIENT_STOCK.to_string()));
  }
  i32::try_from(combined).map_err(|_| AppError::BadRequest(INSUFFICIENT_STOCK.to_string()))
}

async fn count_cart_items(ctx: Shared<AddToCartCtx>) -> Result<Control, AppError> {
  let (cart_id, pool) = {
    let guard = ctx.read();
    (guard.cart_id, guard.app_state.db_pool.clone())
  };

  let count: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM cart_items WHERE cart_id = $1")
    .bind(cart_id)
    .fetch_one(&pool)
    .await?;
  ctx.write().cart_count = count;
  Ok(Control::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn merged_quantity_adds_to_the_existing_line() {
    assert_eq!(merged_quantity(None, 2, 5).unwrap(), 2);
    assert_eq!(merged_quantity(Some(3), 2, 5).unwrap(), 5);
  }

  #[test]
  fn merged_quantity_past_stock_is_rejected() {
    match merged_quantity(Some(4), 2, 5) {
      Err(AppError::BadRequest(message)) => assert_eq!(message, INSUFFICIENT_STOCK),
      other => panic!("expected insufficient stock, got {:?}", other),
    }
  }

  #[test]
  fn merged_quantity_near_the_integer_limit_does_not_wrap() {
    let result = merged_quantity(Some(i32::MAX), i32::MAX, i32::MAX);
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(merged_quantity(Some(i32::MAX - 1), 1, i32::MAX).unwrap(), i32::MAX);
  }
}
