// storefront/tests/db_flows.rs

//! Flows against Postgres. `#[sqlx::test]` gives every test its own fresh
//! database (created through DATABASE_URL) with the migrations applied.

use async_trait::async_trait;
use audio_store::config::AppConfig;
use audio_store::errors::AppError;
use audio_store::flows::cart_flow::INSUFFICIENT_STOCK;
use audio_store::flows::checkout_flow::CART_EMPTY;
use audio_store::flows::contexts::{
  AddToCartCtx, CheckoutCtx, ProductForm, ResetPasswordCtx, SaveProductCtx, SendOtpCtx, VerifyOtpCtx,
};
use audio_store::flows::password_reset_flow::{OTP_INVALID, OTP_RESET_REJECTED};
use audio_store::models::{Product, User};
use audio_store::services::auth_service;
use audio_store::services::mail::LogMailer;
use audio_store::services::media::{ImageUpload, MediaStore, UploadedImage};
use audio_store::state::AppState;
use audio_store::web::payloads::{CheckoutRequest, ResetPasswordRequest, SendOtpRequest, VerifyOtpRequest};
use bytes::Bytes;
use parking_lot::Mutex;
use sqlx::PgPool;
use std::sync::Arc;
use storeflow::Shared;
use uuid::Uuid;

/// Hands out predictable ids and remembers what was destroyed.
#[derive(Default)]
struct RecordingMedia {
  uploads: Mutex<u32>,
  destroyed: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaStore for RecordingMedia {
  async fn upload(&self, _image: ImageUpload, folder: &str) -> Result<UploadedImage, AppError> {
    let mut uploads = self.uploads.lock();
    *uploads += 1;
    let public_id = format!("{}/image-{}", folder, *uploads);
    Ok(UploadedImage {
      secure_url: format!("https://images.test/{}.png", public_id),
      public_id,
    })
  }

  async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
    self.destroyed.lock().push(public_id.to_string());
    Ok(())
  }
}

struct Harness {
  state: AppState,
  mailer: Arc<LogMailer>,
  media: Arc<RecordingMedia>,
}

fn harness(pool: PgPool) -> Harness {
  let mailer = Arc::new(LogMailer::new());
  let media = Arc::new(RecordingMedia::default());
  let state = AppState::new(
    pool,
    Arc::new(AppConfig::for_tests("postgres://provided-by-sqlx-test")),
    mailer.clone(),
    media.clone(),
  );
  Harness { state, mailer, media }
}

async fn insert_user(pool: &PgPool, email: &str, password: &str) -> User {
  sqlx::query_as(&format!(
    "INSERT INTO users (first_name, last_name, email, phone, password_hash) \
     VALUES ('Lan', 'Nguyen', $1, '0901234567', $2) RETURNING {}",
    User::COLUMNS
  ))
  .bind(email)
  .bind(auth_service::hash_password(password).unwrap())
  .fetch_one(pool)
  .await
  .unwrap()
}

async fn insert_category(pool: &PgPool) -> Uuid {
  sqlx::query_scalar("INSERT INTO categories (name, slug) VALUES ('Speakers', $1) RETURNING id")
    .bind(format!("speakers-{}", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn insert_product(pool: &PgPool, name: &str, price_cents: i64, stock: i32) -> Uuid {
  let category_id = insert_category(pool).await;
  sqlx::query_scalar(
    "INSERT INTO products (name, slug, category_id, price_cents, stock) VALUES ($1, $2, $3, $4, $5) RETURNING id",
  )
  .bind(name)
  .bind(format!("{}-{}", name.to_lowercase().replace(' ', "-"), Uuid::new_v4()))
  .bind(category_id)
  .bind(price_cents)
  .bind(stock)
  .fetch_one(pool)
  .await
  .unwrap()
}

async fn stock_of(pool: &PgPool, product_id: Uuid) -> i32 {
  sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn count(pool: &PgPool, sql: &str, user_id: Uuid) -> i64 {
  sqlx::query_scalar(sql).bind(user_id).fetch_one(pool).await.unwrap()
}

async fn order_count(pool: &PgPool, user_id: Uuid) -> i64 {
  count(pool, "SELECT COUNT(*) FROM orders WHERE user_id = $1", user_id).await
}

async fn cart_quantity(pool: &PgPool, user_id: Uuid) -> i64 {
  count(
    pool,
    "SELECT COALESCE(SUM(ci.quantity), 0)::BIGINT FROM cart_items ci JOIN carts c ON c.id = ci.cart_id \
     WHERE c.user_id = $1",
    user_id,
  )
  .await
}

async fn add_to_cart(state: &AppState, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<i64, AppError> {
  let ctx = Shared::new(AddToCartCtx {
    app_state: state.clone(),
    user_id,
    product_id,
    quantity,
    product: None,
    cart_id: None,
    cart_count: 0,
  });
  state.flows.run(ctx.clone()).await?;
  let cart_count = ctx.read().cart_count;
  Ok(cart_count)
}

fn delivery() -> CheckoutRequest {
  CheckoutRequest {
    customer_name: "Lan Nguyen".to_string(),
    customer_phone: "0901234567".to_string(),
    customer_address: "12 Le Loi, District 1".to_string(),
    customer_email: None,
    payment_method: "cod".to_string(),
    note: None,
  }
}

async fn checkout(state: &AppState, user: &User) -> Result<Shared<CheckoutCtx>, AppError> {
  let ctx = Shared::new(CheckoutCtx::new(state.clone(), user.clone(), delivery()));
  state.flows.run(ctx.clone()).await?;
  Ok(ctx)
}

fn assert_bad_request(result: Result<impl std::fmt::Debug, AppError>, expected: &str) {
  match result {
    Err(AppError::BadRequest(message)) => assert_eq!(message, expected),
    other => panic!("expected 400 '{}', got {:?}", expected, other),
  }
}

#[sqlx::test(migrations = "./migrations")]
async fn checkout_places_order_decrements_stock_and_clears_cart(pool: PgPool) {
  let h = harness(pool.clone());
  let user = insert_user(&pool, "lan@example.com", "password123").await;
  let phantom = insert_product(&pool, "Phantom I", 399_000, 5).await;
  let mania = insert_product(&pool, "Mania", 79_000, 4).await;

  add_to_cart(&h.state, user.id, phantom, 2).await.unwrap();
  assert_eq!(add_to_cart(&h.state, user.id, mania, 1).await.unwrap(), 3);

  let ctx = checkout(&h.state, &user).await.unwrap();
  let (order, items, confirmation_sent) = {
    let guard = ctx.read();
    (guard.order.clone().unwrap(), guard.items.clone(), guard.confirmation_sent)
  };

  assert_eq!(order.total_cents, 2 * 399_000 + 79_000);
  assert_eq!(order.customer_email, "lan@example.com");
  assert_eq!(items.len(), 2);
  assert_eq!(stock_of(&pool, phantom).await, 3);
  assert_eq!(stock_of(&pool, mania).await, 3);
  assert_eq!(cart_quantity(&pool, user.id).await, 0);
  assert_eq!(order_count(&pool, user.id).await, 1);

  assert!(confirmation_sent);
  let sent = h.mailer.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].to, "lan@example.com");
}

#[sqlx::test(migrations = "./migrations")]
async fn oversold_checkout_leaves_no_order_and_an_untouched_cart(pool: PgPool) {
  let h = harness(pool.clone());
  let user = insert_user(&pool, "lan@example.com", "password123").await;
  let expert = insert_product(&pool, "Expert Pro", 649_000, 3).await;
  add_to_cart(&h.state, user.id, expert, 2).await.unwrap();

  sqlx::query("UPDATE products SET stock = 1 WHERE id = $1")
    .bind(expert)
    .execute(&pool)
    .await
    .unwrap();

  assert_bad_request(checkout(&h.state, &user).await.map(|_| ()), "Product Expert Pro is out of stock");
  assert_eq!(order_count(&pool, user.id).await, 0);
  assert_eq!(cart_quantity(&pool, user.id).await, 2);
  assert_eq!(stock_of(&pool, expert).await, 1);
  assert!(h.mailer.sent().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn checkout_of_an_empty_cart_is_rejected(pool: PgPool) {
  let h = harness(pool.clone());
  let user = insert_user(&pool, "lan@example.com", "password123").await;
  assert_bad_request(checkout(&h.state, &user).await.map(|_| ()), CART_EMPTY);
}

#[sqlx::test(migrations = "./migrations")]
async fn double_submitted_checkout_sells_the_cart_once(pool: PgPool) {
  let h = harness(pool.clone());
  let user = insert_user(&pool, "lan@example.com", "password123").await;
  let dione = insert_product(&pool, "Dione", 219_000, 10).await;
  add_to_cart(&h.state, user.id, dione, 1).await.unwrap();

  let (first, second) = tokio::join!(checkout(&h.state, &user), checkout(&h.state, &user));
  let rejected = match (first, second) {
    (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
    (a, b) => panic!("expected exactly one order, got {:?} and {:?}", a.map(|_| ()), b.map(|_| ())),
  };
  assert!(matches!(rejected, AppError::BadRequest(ref m) if m == CART_EMPTY));

  assert_eq!(order_count(&pool, user.id).await, 1);
  assert_eq!(stock_of(&pool, dione).await, 9);
}

#[sqlx::test(migrations = "./migrations")]
async fn last_unit_goes_to_exactly_one_buyer(pool: PgPool) {
  let h = harness(pool.clone());
  let lan = insert_user(&pool, "lan@example.com", "password123").await;
  let minh = insert_user(&pool, "minh@example.com", "password123").await;
  let phantom = insert_product(&pool, "Phantom I", 399_000, 1).await;
  add_to_cart(&h.state, lan.id, phantom, 1).await.unwrap();
  add_to_cart(&h.state, minh.id, phantom, 1).await.unwrap();

  let (a, b) = tokio::join!(checkout(&h.state, &lan), checkout(&h.state, &minh));
  let outcomes = [a.is_ok(), b.is_ok()];
  assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1, "{:?}", outcomes);
  for result in [a, b] {
    if let Err(err) = result {
      assert!(matches!(err, AppError::BadRequest(ref m) if m == "Product Phantom I is out of stock"));
    }
  }
  assert_eq!(stock_of(&pool, phantom).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn carts_holding_the_same_products_in_opposite_order_both_check_out(pool: PgPool) {
  let h = harness(pool.clone());
  let lan = insert_user(&pool, "lan@example.com", "password123").await;
  let minh = insert_user(&pool, "minh@example.com", "password123").await;
  let phantom = insert_product(&pool, "Phantom I", 399_000, 10).await;
  let mania = insert_product(&pool, "Mania", 79_000, 10).await;

  add_to_cart(&h.state, lan.id, phantom, 1).await.unwrap();
  add_to_cart(&h.state, lan.id, mania, 1).await.unwrap();
  add_to_cart(&h.state, minh.id, mania, 1).await.unwrap();
  add_to_cart(&h.state, minh.id, phantom, 1).await.unwrap();

  let (a, b) = tokio::join!(checkout(&h.state, &lan), checkout(&h.state, &minh));
  a.unwrap();
  b.unwrap();
  assert_eq!(stock_of(&pool, phantom).await, 8);
  assert_eq!(stock_of(&pool, mania).await, 8);
}

#[sqlx::test(migrations = "./migrations")]
async fn merged_cart_quantity_is_checked_against_stock(pool: PgPool) {
  let h = harness(pool.clone());
  let user = insert_user(&pool, "lan@example.com", "password123").await;
  let mania = insert_product(&pool, "Mania", 79_000, 3).await;

  assert_eq!(add_to_cart(&h.state, user.id, mania, 2).await.unwrap(), 2);
  assert_bad_request(add_to_cart(&h.state, user.id, mania, 2).await, INSUFFICIENT_STOCK);
  assert_eq!(cart_quantity(&pool, user.id).await, 2);

  assert_bad_request(add_to_cart(&h.state, user.id, mania, i32::MAX).await, INSUFFICIENT_STOCK);
  assert_eq!(add_to_cart(&h.state, user.id, mania, 1).await.unwrap(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn password_reset_burns_the_code_and_signs_out_everywhere(pool: PgPool) {
  let h = harness(pool.clone());
  let user = insert_user(&pool, "lan@example.com", "password123").await;
  let token = auth_service::issue_token(&pool, user.id, "auth_token").await.unwrap();
  assert!(auth_service::authenticate(&pool, &token).await.is_ok());

  let send = Shared::new(SendOtpCtx {
    app_state: h.state.clone(),
    input: SendOtpRequest {
      email: user.email.clone(),
    },
    user: None,
    otp: None,
  });
  h.state.flows.run(send.clone()).await.unwrap();
  let code = send.read().otp.clone().unwrap();
  assert!(h.mailer.sent()[0].body.contains(&code));

  let verify = |otp: String| {
    Shared::new(VerifyOtpCtx {
      app_state: h.state.clone(),
      input: VerifyOtpRequest {
        email: user.email.clone(),
        otp,
      },
    })
  };
  h.state.flows.run(verify(code.clone())).await.unwrap();

  let reset = |otp: String| {
    Shared::new(ResetPasswordCtx {
      app_state: h.state.clone(),
      input: ResetPasswordRequest {
        email: user.email.clone(),
        otp,
        password: "new-password-1".to_string(),
        password_confirmation: "new-password-1".to_string(),
      },
      revoked_tokens: 0,
    })
  };
  let first = reset(code.clone());
  h.state.flows.run(first.clone()).await.unwrap();
  assert_eq!(first.read().revoked_tokens, 1);

  assert!(matches!(
    auth_service::authenticate(&pool, &token).await,
    Err(AppError::Auth(_))
  ));
  let hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
    .bind(user.id)
    .fetch_one(&pool)
    .await
    .unwrap();
  assert!(auth_service::verify_password(&hash, "new-password-1").unwrap());

  assert_bad_request(h.state.flows.run(reset(code.clone())).await, OTP_RESET_REJECTED);
  assert_bad_request(h.state.flows.run(verify(code)).await, OTP_INVALID);
}

fn product_form(name: &str, category_id: Uuid) -> ProductForm {
  ProductForm {
    name: Some(name.to_string()),
    price: Some("3990".to_string()),
    category_id: Some(category_id.to_string()),
    stock: Some("5".to_string()),
    ..Default::default()
  }
}

fn png() -> ImageUpload {
  ImageUpload {
    bytes: Bytes::from_static(b"\x89PNG"),
    file_name: "speaker.png".to_string(),
    content_type: "image/png".to_string(),
  }
}

async fn save_product(
  state: &AppState,
  product_id: Option<Uuid>,
  form: ProductForm,
  image: Option<ImageUpload>,
) -> Result<Product, AppError> {
  let ctx = Shared::new(SaveProductCtx {
    app_state: state.clone(),
    product_id,
    form,
    image,
    fields: None,
    existing: None,
    uploaded: None,
    slug: None,
    saved: None,
  });
  state.flows.run(ctx.clone()).await?;
  let saved = ctx.write().saved.take();
  Ok(saved.unwrap())
}

#[sqlx::test(migrations = "./migrations")]
async fn product_slugs_get_a_free_suffix_and_follow_renames(pool: PgPool) {
  let h = harness(pool.clone());
  let category_id = insert_category(&pool).await;

  let first = save_product(&h.state, None, product_form("Phantom I", category_id), Some(png())).await.unwrap();
  let second = save_product(&h.state, None, product_form("Phantom I", category_id), Some(png())).await.unwrap();
  let third = save_product(&h.state, None, product_form("Phantom I", category_id), Some(png())).await.unwrap();
  assert_eq!(first.slug, "phantom-i");
  assert_eq!(second.slug, "phantom-i-1");
  assert_eq!(third.slug, "phantom-i-2");

  let unchanged = save_product(&h.state, Some(second.id), product_form("Phantom I", category_id), None).await.unwrap();
  assert_eq!(unchanged.slug, "phantom-i-1");

  let renamed = save_product(&h.state, Some(first.id), product_form("Mania", category_id), Some(png())).await.unwrap();
  assert_eq!(renamed.slug, "mania");
  assert_eq!(h.media.destroyed.lock().clone(), vec![first.image_public_id.unwrap()]);
}
