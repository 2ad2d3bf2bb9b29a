// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  Cod,
  BankTransfer,
  CreditCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Unpaid,
  Paid,
  Refunded,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub order_number: String,
  pub customer_name: String,
  pub customer_phone: String,
  pub customer_address: String,
  pub customer_email: String,
  pub subtotal_cents: i64,
  pub shipping_fee_cents: i64,
  pub total_cents: i64,
  pub payment_method: PaymentMethod,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub note: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub const COLUMNS: &'static str = "id, user_id, order_number, customer_name, customer_phone, customer_address, \
     customer_email, subtotal_cents, shipping_fee_cents, total_cents, payment_method, status, payment_status, note, \
     created_at, updated_at";
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  /// Cleared when the product is later deleted; the name snapshot remains.
  pub product_id: Option<Uuid>,
  pub product_name: String,
  pub price_cents: i64,
  pub quantity: i32,
  pub subtotal_cents: i64,
  pub created_at: DateTime<Utc>,
}

impl OrderItem {
  pub const COLUMNS: &'static str =
    "id, order_id, product_id, product_name, price_cents, quantity, subtotal_cents, created_at";
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItem>,
}
