// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashMap;
use storeflow::{Outcome, Shared};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::flows::contexts::CheckoutCtx;
use crate::models::{Order, OrderItem, OrderWithItems};
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;
use crate::web::payloads::CheckoutRequest;

/// Attaches items to each order, keeping the order of `orders`.
async fn with_items(pool: &PgPool, orders: Vec<Order>) -> Result<Vec<OrderWithItems>, AppError> {
  let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
  let items: Vec<OrderItem> = sqlx::query_as(&format!(
    "SELECT {} FROM order_items WHERE order_id = ANY($1) ORDER BY created_at, id",
    OrderItem::COLUMNS
  ))
  .bind(&ids)
  .fetch_all(pool)
  .await?;

  let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
  for item in items {
    by_order.entry(item.order_id).or_default().push(item);
  }
  Ok(
    orders
      .into_iter()
      .map(|order| {
        let items = by_order.remove(&order.id).unwrap_or_default();
        OrderWithItems { order, items }
      })
      .collect(),
  )
}

#[instrument(name = "handler::checkout", skip(app_state, payload, auth), fields(user_id = %auth.user.id))]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutRequest>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(CheckoutCtx::new(
    app_state.get_ref().clone(),
    auth.user,
    payload.into_inner(),
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(Outcome::Completed) => {
      let guard = ctx.read();
      let order = guard.order.clone().ok_or_else(|| {
        warn!("Checkout completed but no order was recorded.");
        AppError::Internal("Failed to create order: no order recorded.".to_string())
      })?;
      info!(
        order_id = %order.id,
        order_number = %order.order_number,
        confirmation_sent = guard.confirmation_sent,
        "Order placed."
      );

      Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Order placed successfully",
        "order": OrderWithItems { order, items: guard.items.clone() },
      })))
    }
    Ok(Outcome::Stopped) => {
      warn!("Checkout flow was stopped by a handler.");
      Err(AppError::Internal("Failed to create order: checkout was halted.".to_string()))
    }
    Err(app_err) if app_err.is_client_error() => {
      warn!(error = %app_err, "Checkout rejected.");
      Err(app_err)
    }
    Err(app_err) => {
      error!(error = %app_err, "Checkout failed.");
      Err(AppError::Internal(format!("Failed to create order: {}", app_err)))
    }
  }
}

#[instrument(name = "handler::list_orders", skip_all, fields(user_id = %auth.user.id))]
pub async fn list_orders_handler(app_state: web::Data<AppState>, auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let orders: Vec<Order> = sqlx::query_as(&format!(
    "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    Order::COLUMNS
  ))
  .bind(auth.user.id)
  .fetch_all(&app_state.db_pool)
  .await?;

  let orders = with_items(&app_state.db_pool, orders).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "orders": orders,
  })))
}

/// Another user's order is reported as missing.
#[instrument(name = "handler::get_order", skip(app_state, auth), fields(user_id = %auth.user.id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order: Order = sqlx::query_as(&format!(
    "SELECT {} FROM orders WHERE id = $1 AND user_id = $2",
    Order::COLUMNS
  ))
  .bind(path.into_inner())
  .bind(auth.user.id)
  .fetch_optional(&app_state.db_pool)
  .await?
  .ok_or_else(|| AppError::NotFound("Order not found.".to_string()))?;

  let order = with_items(&app_state.db_pool, vec![order])
    .await?
    .pop()
    .ok_or_else(|| AppError::Internal("Order lookup lost its row.".to_string()))?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "order": order,
  })))
}
