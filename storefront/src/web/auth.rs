// storefront/src/web/auth.rs

//! Bearer-token extractors. `AuthenticatedUser` resolves
//! `Authorization: Bearer <id>|<secret>` to a user; `AdminUser` additionally
//! requires the admin role.

use crate::errors::AppError;
use crate::models::User;
use crate::services::auth_service;
use crate::state::AppState;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};
use uuid::Uuid;

pub const UNAUTHENTICATED: &str = "Unauthenticated.";

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user: User,
  /// The access token the request was made with.
  pub token_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

/// The presented token, or 401 before any database work when the header is
/// missing or not of the `<id>|<secret>` form.
fn presented_token(req: &HttpRequest) -> Result<String, AppError> {
  let header = req
    .headers()
    .get(AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .ok_or_else(|| AppError::Auth(UNAUTHENTICATED.to_string()))?;
  let token = auth_service::bearer_token(header).ok_or_else(|| AppError::Auth(UNAUTHENTICATED.to_string()))?;
  if auth_service::parse_plain_token(token).is_none() {
    debug!("Malformed bearer token.");
    return Err(AppError::Auth(UNAUTHENTICATED.to_string()));
  }
  Ok(token.to_string())
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let token = presented_token(req);
    let state = req.app_data::<web::Data<AppState>>().cloned();

    Box::pin(async move {
      let token = token?;
      let state = state.ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;
      let (user, token_id) = auth_service::authenticate(&state.db_pool, &token).await?;
      Ok(AuthenticatedUser { user, token_id })
    })
  }
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    let authenticated = AuthenticatedUser::from_request(req, payload);
    Box::pin(async move {
      let auth = authenticated.await?;
      if !auth.user.is_admin() {
        warn!(user_id = %auth.user.id, "Non-admin user hit an admin route.");
        return Err(AppError::Forbidden("Unauthorized. Admin access required.".to_string()));
      }
      Ok(AdminUser(auth))
    })
  }
}
