// storefront/src/web/routes.rs

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::errors::{AppError, ValidationFailure};
use crate::web::multipart::BODY_TOO_LARGE;
use crate::web::handlers::{
  admin_product_handlers, auth_handlers, cart_handlers, catalog_handlers, contact_handlers, order_handlers,
  password_handlers, settings_handlers,
};

/// Upper bound for buffered bodies, multipart uploads included. Image size
/// limits must stay below it.
pub const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

const NOT_FOUND: &str = "Not Found";

async fn not_found_handler() -> HttpResponse {
  HttpResponse::NotFound().json(json!({ "success": false, "error": NOT_FOUND }))
}

/// A path segment that does not parse (e.g. a malformed id) names no
/// resource.
fn path_error_handler(err: PathError, req: &HttpRequest) -> actix_web::Error {
  tracing::debug!(path = %req.path(), error = %err, "Unparseable path parameter.");
  AppError::NotFound(NOT_FOUND.to_string()).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(ValidationFailure::field("query", format!("The given data was invalid: {}", err))).into()
}

/// Undecodable JSON bodies are reported as validation failures, oversize
/// ones as 413.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  if matches!(err, JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. }) {
    return AppError::PayloadTooLarge(BODY_TOO_LARGE.to_string()).into();
  }
  let message = match &err {
    JsonPayloadError::ContentType => "The request body must be JSON.".to_string(),
    JsonPayloadError::Deserialize(e) => format!("The given data was invalid: {}", e),
    other => format!("The given data was invalid: {}", other),
  };
  AppError::Validation(ValidationFailure::field("body", message)).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().limit(MAX_BODY_BYTES).error_handler(json_error_handler))
    .app_data(web::PathConfig::default().error_handler(path_error_handler))
    .app_data(web::QueryConfig::default().error_handler(query_error_handler))
    .service(
      web::scope("/api")
        .route("/health", web::get().to(health_check_handler))
        // Authentication
        .route("/register", web::post().to(auth_handlers::register_handler))
        .route("/login", web::post().to(auth_handlers::login_handler))
        .route("/logout", web::post().to(auth_handlers::logout_handler))
        .route("/user", web::get().to(auth_handlers::current_user_handler))
        .service(
          web::scope("/forgot-password")
            .route("/send-otp", web::post().to(password_handlers::send_otp_handler))
            .route("/verify-otp", web::post().to(password_handlers::verify_otp_handler))
            .route("/reset", web::post().to(password_handlers::reset_password_handler)),
        )
        // Catalog
        .route("/products", web::get().to(catalog_handlers::list_products_handler))
        .route("/products/{key}", web::get().to(catalog_handlers::get_product_handler))
        .route("/categories", web::get().to(catalog_handlers::list_categories_handler))
        .route("/categories/{key}", web::get().to(catalog_handlers::get_category_handler))
        // Cart
        .service(
          web::scope("/cart")
            .route("", web::get().to(cart_handlers::get_cart_handler))
            .route("/add", web::post().to(cart_handlers::add_to_cart_handler))
            .route("/update/{item_id}", web::put().to(cart_handlers::update_cart_item_handler))
            .route("/remove/{item_id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
        )
        // Orders
        .service(
          web::scope("/orders")
            .route("", web::get().to(order_handlers::list_orders_handler))
            .route("/checkout", web::post().to(order_handlers::checkout_handler))
            .route("/{order_id}", web::get().to(order_handlers::get_order_handler)),
        )
        // Account settings and contact
        .route("/settings/profile", web::post().to(settings_handlers::update_profile_handler))
        .route("/settings/avatar", web::post().to(settings_handlers::update_avatar_handler))
        .route("/settings/avatar", web::delete().to(settings_handlers::remove_avatar_handler))
        .route("/contact", web::post().to(contact_handlers::contact_handler))
        // Admin
        .service(
          web::scope("/admin/products")
            .route("", web::get().to(admin_product_handlers::list_products_handler))
            .route("", web::post().to(admin_product_handlers::create_product_handler))
            .route("/{product_id}", web::get().to(admin_product_handlers::get_product_handler))
            .route("/{product_id}", web::post().to(admin_product_handlers::update_product_handler))
            .route("/{product_id}", web::put().to(admin_product_handlers::update_product_handler))
            .route("/{product_id}", web::delete().to(admin_product_handlers::delete_product_handler)),
        ),
    )
    .default_service(web::route().to(not_found_handler));
}
