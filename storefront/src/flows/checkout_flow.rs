// storefront/src/flows/checkout_flow.rs

//! Order placement.
//!
//! Every database step runs inside the one transaction stored in
//! `CheckoutCtx::tx`. A failing step returns before putting the transaction
//! back, the transaction is dropped and Postgres rolls back everything done
//! so far: no order, no order items, no stock change, cart untouched.
//! The cart row is locked before its lines are read, so a double-submitted
//! checkout finds the cart already emptied. Product rows are then locked
//! `FOR UPDATE` in id order: two checkouts of the last unit serialize on the
//! lock, the second one sees the reduced stock, and overlapping carts never
//! wait on each other in opposite orders.

use crate::errors::AppError;
use crate::flows::contexts::CheckoutCtx;
use crate::models::{CartLine, Order, OrderItem, OrderStatus, PaymentStatus};
use crate::services::{mail, pricing};
use crate::web::payloads::parse_payment_method;
use sqlx::{Postgres, Transaction};
use storeflow::{Control, Flow, Registry, Shared};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

pub const CART_EMPTY: &str = "Cart is empty";

pub fn register_checkout_flow(registry: &Registry<AppError>) {
  let mut flow = Flow::<CheckoutCtx, AppError>::new(
    "checkout",
    &[
      "validate_checkout_input",
      "open_transaction",
      "load_cart_lines",
      "verify_stock",
      "price_order",
      "insert_order",
      "insert_order_items_and_decrement_stock",
      "clear_cart",
      "commit",
      "send_order_confirmation",
    ],
  );

  flow.on("validate_checkout_input", validate_checkout_input);
  flow.on("open_transaction", open_transaction);
  flow.on("load_cart_lines", load_cart_lines);
  flow.on("verify_stock", |ctx: Shared<CheckoutCtx>| async move {
    pricing::ensure_in_stock(&ctx.read().lines)?;
    Ok::<_, AppError>(Control::Continue)
  });
  flow.on("price_order", |ctx: Shared<CheckoutCtx>| async move {
    let mut guard = ctx.write();
    let totals = pricing::price_lines(&guard.lines, guard.app_state.config.shipping_fee_cents)?;
    guard.totals = Some(totals);
    Ok::<_, AppError>(Control::Continue)
  });
  flow.on("insert_order", insert_order);
  flow.on("insert_order_items_and_decrement_stock", insert_order_items_and_decrement_stock);
  flow.on("clear_cart", clear_cart);
  flow.on("commit", commit);
  flow.on("send_order_confirmation", send_order_confirmation);

  flow
    .optional("send_order_confirmation")
    .skip_when("send_order_confirmation", |ctx: &CheckoutCtx| !ctx.committed);

  registry.register(flow);
}

fn take_tx(ctx: &Shared<CheckoutCtx>) -> Result<Transaction<'static, Postgres>, AppError> {
  ctx
    .read()
    .tx
    .lock()
    .take()
    .ok_or_else(|| AppError::Internal("Checkout transaction is not open.".to_string()))
}

fn put_tx(ctx: &Shared<CheckoutCtx>, tx: Transaction<'static, Postgres>) {
  *ctx.read().tx.lock() = Some(tx);
}

async fn validate_checkout_input(ctx: Shared<CheckoutCtx>) -> Result<Control, AppError> {
  let mut guard = ctx.write();
  let input = std::mem::take(&mut guard.input).normalized();
  input.validate()?;
  guard.input = input;
  Ok(Control::Continue)
}

async fn open_transaction(ctx: Shared<CheckoutCtx>) -> Result<Control, AppError> {
  let pool = ctx.read().app_state.db_pool.clone();
  let tx = pool.begin().await?;
  put_tx(&ctx, tx);
  Ok(Control::Continue)
}

/// Locks the user's cart row first, then reads its lines and locks their
/// products in id order. A second checkout of the same cart waits on the
/// cart lock and its line query then sees the first checkout's deletes.
async fn load_cart_lines(ctx: Shared<CheckoutCtx>) -> Result<Control, AppError> {
  let user_id = ctx.read().user.id;
  let mut tx = take_tx(&ctx)?;

  let cart_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1 FOR UPDATE")
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;
  let Some(cart_id) = cart_id else {
    return Err(AppError::BadRequest(CART_EMPTY.to_string()));
  };

  let lines: Vec<CartLine> = sqlx::query_as(
    "SELECT ci.id, ci.product_id, ci.quantity, ci.price_cents, \
            p.name AS product_name, p.slug AS product_slug, p.image_url AS product_image_url, \
            p.stock AS product_stock \
     FROM cart_items ci \
     JOIN products p ON p.id = ci.product_id \
     WHERE ci.cart_id = $1 \
     ORDER BY p.id \
     FOR UPDATE OF p",
  )
  .bind(cart_id)
  .fetch_all(&mut *tx)
  .await?;

  if lines.is_empty() {
    return Err(AppError::BadRequest(CART_EMPTY.to_string()));
  }
  put_tx(&ctx, tx);
  ctx.write().lines = lines;
  Ok(Control::Continue)
}

#[instrument(name = "checkout::insert_order", skip_all, err(Display))]
async fn insert_order(ctx: Shared<CheckoutCtx>) -> Result<Control, AppError> {
  let (user_id, account_email, input, totals) = {
    let guard = ctx.read();
    let totals = guard
      .totals
      .ok_or_else(|| AppError::Internal("Order insert before pricing.".to_string()))?;
    (guard.user.id, guard.user.email.clone(), guard.input.clone(), totals)
  };
  let payment_method = parse_payment_method(&input.payment_method)
    .ok_or_else(|| AppError::validation("payment_method", "The selected payment method is invalid."))?;
  let mut tx = take_tx(&ctx)?;

  let order: Order = sqlx::query_as(&format!(
    "INSERT INTO orders (user_id, order_number, customer_name, customer_phone, customer_address, customer_email, \
       subtotal_cents, shipping_fee_cents, total_cents, payment_method, status, payment_status, note) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {}",
    Order::COLUMNS
  ))
  .bind(user_id)
  .bind(pricing::new_order_number())
  .bind(input.customer_name.trim())
  .bind(input.customer_phone.trim())
  .bind(input.customer_address.trim())
  .bind(input.customer_email.unwrap_or(account_email))
  .bind(totals.subtotal_cents)
  .bind(totals.shipping_fee_cents)
  .bind(totals.total_cents)
  .bind(payment_method)
  .bind(OrderStatus::Pending)
  .bind(PaymentStatus::Unpaid)
  .bind(input.note)
  .fetch_one(&mut *tx)
  .await?;

  info!(order_id = %order.id, order_number = %order.order_number, total_cents = order.total_cents, "Order row created.");
  put_tx(&ctx, tx);
  ctx.write().order = Some(order);
  Ok(Control::Continue)
}

/// One order item per cart line, and the matching stock decrement. The
/// decrement only applies while enough stock remains, so stock can never go
/// negative even if a row was changed outside the lock.
async fn insert_order_items_and_decrement_stock(ctx: Shared<CheckoutCtx>) -> Result<Control, AppError> {
  let (order_id, lines) = {
    let guard = ctx.read();
    let order_id = guard
      .order
      .as_ref()
      .map(|o| o.id)
      .ok_or_else(|| AppError::Internal("Order items before order.".to_string()))?;
    (order_id, guard.lines.clone())
  };
  let mut tx = take_tx(&ctx)?;

  let mut items = Vec::with_capacity(lines.len());
  for line in &lines {
    let item: OrderItem = sqlx::query_as(&format!(
      "INSERT INTO order_items (order_id, product_id, product_name, price_cents, quantity, subtotal_cents) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
      OrderItem::COLUMNS
    ))
    .bind(order_id)
    .bind(line.product_id)
    .bind(&line.product_name)
    .bind(line.price_cents)
    .bind(line.quantity)
    .bind(pricing::PricedLine::subtotal_cents(line)?)
    .fetch_one(&mut *tx)
    .await?;

    let updated = sqlx::query(
      "UPDATE products SET stock = stock - $1, updated_at = NOW() WHERE id = $2 AND stock >= $1",
    )
    .bind(line.quantity)
    .bind(line.product_id)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
      warn!(product_id = %line.product_id, "Stock decrement refused.");
      return Err(pricing::out_of_stock(&line.product_name));
    }
    items.push(item);
  }

  put_tx(&ctx, tx);
  ctx.write().items = items;
  Ok(Control::Continue)
}

async fn clear_cart(ctx: Shared<CheckoutCtx>) -> Result<Control, AppError> {
  let user_id = ctx.read().user.id;
  let mut tx = take_tx(&ctx)?;
  sqlx::query("DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)")
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
  put_tx(&ctx, tx);
  Ok(Control::Continue)
}

async fn commit(ctx: Shared<CheckoutCtx>) -> Result<Control, AppError> {
  let tx = take_tx(&ctx)?;
  tx.commit().await?;
  ctx.write().committed = true;
  info!("Checkout committed.");
  Ok(Control::Continue)
}

/// Runs after commit. A failed mail is logged; the order stands.
async fn send_order_confirmation(ctx: Shared<CheckoutCtx>) -> Result<Control, AppError> {
  let (message, mailer) = {
    let guard = ctx.read();
    let Some(order) = guard.order.as_ref() else {
      return Ok(Control::Continue);
    };
    (
      mail::order_confirmation_mail(order, &guard.items, &guard.app_state.config.app_base_url),
      guard.app_state.mailer.clone(),
    )
  };

  match mailer.send(message).await {
    Ok(()) => ctx.write().confirmation_sent = true,
    Err(e) => warn!(error = %e, "Order confirmation mail failed."),
  }
  Ok(Control::Continue)
}
