// storefront/src/flows/contexts.rs

//! Context types the flows run over. Handlers receive them wrapped in
//! `storeflow::Shared`; the registry dispatches on the type.

use crate::models::{CartLine, Order, OrderItem, Product, User};
use crate::services::media::{ImageUpload, UploadedImage};
use crate::services::pricing::OrderTotals;
use crate::state::AppState;
use crate::web::payloads::{CheckoutRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, SendOtpRequest, VerifyOtpRequest};
use parking_lot::Mutex;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub struct SignupCtx {
  pub app_state: AppState,
  pub input: RegisterRequest,
  pub user: Option<User>,
  pub token: Option<String>,
}

pub struct SigninCtx {
  pub app_state: AppState,
  pub input: LoginRequest,
  pub user: Option<User>,
  pub token: Option<String>,
}

pub struct SendOtpCtx {
  pub app_state: AppState,
  pub input: SendOtpRequest,
  pub user: Option<User>,
  pub otp: Option<String>,
}

pub struct VerifyOtpCtx {
  pub app_state: AppState,
  pub input: VerifyOtpRequest,
}

pub struct ResetPasswordCtx {
  pub app_state: AppState,
  pub input: ResetPasswordRequest,
  pub revoked_tokens: u64,
}

pub struct AddToCartCtx {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub product: Option<Product>,
  pub cart_id: Option<Uuid>,
  pub cart_count: i64,
}

/// Checkout state. `tx` is the one transaction every database step runs
/// in; a step takes it out, uses it and puts it back. Dropping it anywhere
/// before `commit` rolls the whole order back.
pub struct CheckoutCtx {
  pub app_state: AppState,
  pub user: User,
  pub input: CheckoutRequest,
  pub tx: Mutex<Option<Transaction<'static, Postgres>>>,
  pub lines: Vec<CartLine>,
  pub totals: Option<OrderTotals>,
  pub order: Option<Order>,
  pub items: Vec<OrderItem>,
  pub committed: bool,
  pub confirmation_sent: bool,
}

impl CheckoutCtx {
  pub fn new(app_state: AppState, user: User, input: CheckoutRequest) -> Self {
    Self {
      app_state,
      user,
      input,
      tx: Mutex::new(None),
      lines: Vec::new(),
      totals: None,
      order: None,
      items: Vec::new(),
      committed: false,
      confirmation_sent: false,
    }
  }
}

/// Text fields of the admin product form, before validation.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
  pub name: Option<String>,
  pub price: Option<String>,
  pub category_id: Option<String>,
  pub description: Option<String>,
  pub details: Option<String>,
  pub stock: Option<String>,
  pub featured: bool,
}

/// Form fields after validation.
#[derive(Debug, Clone)]
pub struct ProductFields {
  pub name: String,
  pub price_cents: i64,
  pub category_id: Uuid,
  pub description: Option<String>,
  pub details: Option<String>,
  pub stock: i32,
  pub featured: bool,
}

pub struct SaveProductCtx {
  pub app_state: AppState,
  /// `None` creates, `Some` updates that product.
  pub product_id: Option<Uuid>,
  pub form: ProductForm,
  pub image: Option<ImageUpload>,
  pub fields: Option<ProductFields>,
  pub existing: Option<Product>,
  pub uploaded: Option<UploadedImage>,
  pub slug: Option<String>,
  pub saved: Option<Product>,
}
