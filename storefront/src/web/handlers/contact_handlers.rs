// storefront/src/web/handlers/contact_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{error, info, instrument};
use validator::Validate;

use crate::errors::AppError;
use crate::services::mail::{contact_mail, ContactDetails};
use crate::state::AppState;
use crate::web::payloads::ContactRequest;

#[instrument(name = "handler::contact", skip(app_state, payload), fields(email = %payload.email))]
pub async fn contact_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ContactRequest>,
) -> Result<HttpResponse, AppError> {
  payload.validate()?;

  let details = ContactDetails {
    name: payload.name.trim(),
    email: payload.email.trim(),
    phone: payload.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()),
    subject: payload.subject.trim(),
    message: payload.message.trim(),
  };
  let message = contact_mail(&app_state.config.mail_to_address, &details);

  if let Err(e) = app_state.mailer.send(message).await {
    error!(error = %e, "Contact mail failed.");
    return Err(AppError::Mail(
      "Sorry, something went wrong. Please try again later.".to_string(),
    ));
  }
  info!("Contact message forwarded.");

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Thank you for contacting us! We will get back to you soon.",
  })))
}
