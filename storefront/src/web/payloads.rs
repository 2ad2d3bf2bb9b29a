// storefront/src/web/payloads.rs

//! JSON request bodies and their validation rules.
//!
//! Text fields default to empty so a missing field is reported as a field
//! error (422) instead of a body parse failure.

use crate::models::PaymentMethod;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub static EMAIL_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles"));

pub static PHONE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(\+?84|0)(3|5|7|8|9)[0-9]{8}$").expect("phone pattern compiles"));

pub const PHONE_MESSAGE: &str = "Please enter a valid Vietnamese phone number (e.g., 0901234567 or +84901234567).";

fn not_blank(value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    return Err(ValidationError::new("required").with_message(Cow::Borrowed("This field is required.")));
  }
  Ok(())
}

fn six_digits(value: &str) -> Result<(), ValidationError> {
  if crate::services::otp::is_well_formed(value) {
    Ok(())
  } else {
    Err(ValidationError::new("digits").with_message(Cow::Borrowed("The otp must be 6 digits.")))
  }
}

fn known_payment_method(value: &str) -> Result<(), ValidationError> {
  match parse_payment_method(value) {
    Some(_) => Ok(()),
    None => Err(ValidationError::new("in").with_message(Cow::Borrowed("The selected payment method is invalid."))),
  }
}

pub fn parse_payment_method(value: &str) -> Option<PaymentMethod> {
  match value {
    "cod" => Some(PaymentMethod::Cod),
    "bank_transfer" => Some(PaymentMethod::BankTransfer),
    "credit_card" => Some(PaymentMethod::CreditCard),
    _ => None,
  }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
  #[validate(
    custom(function = "not_blank", message = "The first name field is required."),
    length(max = 255, message = "The first name may not be greater than 255 characters.")
  )]
  pub first_name: String,
  #[validate(
    custom(function = "not_blank", message = "The last name field is required."),
    length(max = 255, message = "The last name may not be greater than 255 characters.")
  )]
  pub last_name: String,
  #[validate(
    email(message = "Please enter a valid email address from a real email provider."),
    regex(path = *EMAIL_RE, message = "The email format is invalid."),
    length(max = 255, message = "The email may not be greater than 255 characters.")
  )]
  pub email: String,
  #[validate(
    length(max = 20, message = "The phone may not be greater than 20 characters."),
    regex(path = *PHONE_RE, message = "Please enter a valid Vietnamese phone number (e.g., 0901234567 or +84901234567).")
  )]
  pub phone: String,
  #[validate(
    length(min = 8, message = "The password must be at least 8 characters."),
    must_match(other = "password_confirmation", message = "The password confirmation does not match.")
  )]
  pub password: String,
  pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
  #[validate(email(message = "The email must be a valid email address."))]
  pub email: String,
  #[validate(custom(function = "not_blank", message = "The password field is required."))]
  pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SendOtpRequest {
  #[validate(email(message = "The email must be a valid email address."))]
  pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct VerifyOtpRequest {
  #[validate(email(message = "The email must be a valid email address."))]
  pub email: String,
  #[validate(custom(function = "six_digits"))]
  pub otp: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordRequest {
  #[validate(email(message = "The email must be a valid email address."))]
  pub email: String,
  #[validate(custom(function = "six_digits"))]
  pub otp: String,
  #[validate(
    length(min = 8, message = "The password must be at least 8 characters."),
    must_match(other = "password_confirmation", message = "The password confirmation does not match.")
  )]
  pub password: String,
  pub password_confirmation: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddToCartRequest {
  pub product_id: Uuid,
  #[serde(default = "one")]
  #[validate(range(min = 1, message = "The quantity must be at least 1."))]
  pub quantity: i32,
}

fn one() -> i32 {
  1
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateCartRequest {
  #[validate(range(min = 1, message = "The quantity must be at least 1."))]
  pub quantity: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CheckoutRequest {
  #[validate(
    custom(function = "not_blank", message = "The customer name field is required."),
    length(max = 255, message = "The customer name may not be greater than 255 characters.")
  )]
  pub customer_name: String,
  #[validate(
    custom(function = "not_blank", message = "The customer phone field is required."),
    length(max = 20, message = "The customer phone may not be greater than 20 characters.")
  )]
  pub customer_phone: String,
  #[validate(custom(function = "not_blank", message = "The customer address field is required."))]
  pub customer_address: String,
  #[validate(
    email(message = "The customer email must be a valid email address."),
    length(max = 255, message = "The customer email may not be greater than 255 characters.")
  )]
  pub customer_email: Option<String>,
  #[validate(custom(function = "known_payment_method"))]
  pub payment_method: String,
  pub note: Option<String>,
}

impl CheckoutRequest {
  /// Blank optional strings count as absent.
  pub fn normalized(mut self) -> Self {
    self.customer_email = self.customer_email.filter(|e| !e.trim().is_empty());
    self.note = self.note.filter(|n| !n.trim().is_empty());
    self
  }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileRequest {
  #[validate(
    custom(function = "not_blank", message = "The first name field is required."),
    length(max = 255, message = "The first name may not be greater than 255 characters.")
  )]
  pub first_name: String,
  #[validate(
    custom(function = "not_blank", message = "The last name field is required."),
    length(max = 255, message = "The last name may not be greater than 255 characters.")
  )]
  pub last_name: String,
  #[validate(
    email(message = "Please enter a valid email address from a real email provider."),
    regex(path = *EMAIL_RE, message = "The email format is invalid."),
    length(max = 255, message = "The email may not be greater than 255 characters.")
  )]
  pub email: String,
  #[validate(
    length(max = 20, message = "The phone may not be greater than 20 characters."),
    regex(path = *PHONE_RE, message = "Please enter a valid Vietnamese phone number (e.g., 0901234567 or +84901234567).")
  )]
  pub phone: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactRequest {
  #[validate(
    custom(function = "not_blank", message = "The name field is required."),
    length(max = 255, message = "The name may not be greater than 255 characters.")
  )]
  pub name: String,
  #[validate(
    email(message = "The email must be a valid email address."),
    length(max = 255, message = "The email may not be greater than 255 characters.")
  )]
  pub email: String,
  #[validate(length(max = 20, message = "The phone may not be greater than 20 characters."))]
  pub phone: Option<String>,
  #[validate(custom(function = "not_blank", message = "The subject field is required."))]
  pub subject: String,
  #[validate(
    custom(function = "not_blank", message = "The message field is required."),
    length(max = 5000, message = "The message may not be greater than 5000 characters.")
  )]
  pub message: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn valid_registration() -> RegisterRequest {
    RegisterRequest {
      first_name: "Lan".into(),
      last_name: "Nguyen".into(),
      email: "lan.nguyen@example.com".into(),
      phone: "0901234567".into(),
      password: "supersecret".into(),
      password_confirmation: "supersecret".into(),
    }
  }

  fn failing_fields(result: Result<(), validator::ValidationErrors>) -> Vec<String> {
    let mut fields: Vec<String> = result
      .unwrap_err()
      .field_errors()
      .keys()
      .map(|field| field.to_string())
      .collect();
    fields.sort();
    fields
  }

  #[test]
  fn complete_registration_passes() {
    assert!(valid_registration().validate().is_ok());
  }

  #[test]
  fn phone_numbers_follow_the_local_format() {
    for ok in ["0901234567", "+84901234567", "84381234567", "0701234567"] {
      assert!(PHONE_RE.is_match(ok), "{} should match", ok);
    }
    for bad in ["0101234567", "090123456", "+1 555 0100", "09012345678"] {
      assert!(!PHONE_RE.is_match(bad), "{} should not match", bad);
    }
  }

  #[test]
  fn registration_reports_each_bad_field() {
    let mut req = valid_registration();
    req.first_name = "  ".into();
    req.email = "lan@localhost".into();
    req.phone = "12345".into();
    req.password_confirmation = "different".into();
    assert_eq!(
      failing_fields(req.validate()),
      vec!["email", "first_name", "password", "phone"]
    );
  }

  #[test]
  fn short_password_is_rejected() {
    let mut req = valid_registration();
    req.password = "short".into();
    req.password_confirmation = "short".into();
    assert_eq!(failing_fields(req.validate()), vec!["password"]);
  }

  #[test]
  fn otp_must_be_six_digits() {
    let req = VerifyOtpRequest {
      email: "lan@example.com".into(),
      otp: "12a456".into(),
    };
    assert_eq!(failing_fields(req.validate()), vec!["otp"]);
  }

  #[test]
  fn checkout_requires_known_payment_method() {
    let req = CheckoutRequest {
      customer_name: "Lan".into(),
      customer_phone: "0901234567".into(),
      customer_address: "1 Le Loi, District 1".into(),
      customer_email: None,
      payment_method: "bitcoin".into(),
      note: None,
    };
    assert_eq!(failing_fields(req.validate()), vec!["payment_method"]);
    assert_eq!(parse_payment_method("bank_transfer"), Some(PaymentMethod::BankTransfer));
  }

  #[test]
  fn blank_optional_checkout_fields_are_dropped() {
    let req = CheckoutRequest {
      customer_email: Some("  ".into()),
      note: Some(String::new()),
      ..Default::default()
    }
    .normalized();
    assert!(req.customer_email.is_none());
    assert!(req.note.is_none());
  }

  #[test]
  fn quantity_defaults_to_one() {
    let req: AddToCartRequest =
      serde_json::from_str(r#"{"product_id":"6f1c1d4e-8a53-4e0e-9a51-6c2b0c1f0a11"}"#).unwrap();
    assert_eq!(req.quantity, 1);
    assert!(req.validate().is_ok());
  }

  #[test]
  fn contact_message_is_capped() {
    let req = ContactRequest {
      name: "Minh".into(),
      email: "minh@example.com".into(),
      phone: None,
      subject: "Hello".into(),
      message: "x".repeat(5001),
    };
    assert_eq!(failing_fields(req.validate()), vec!["message"]);
  }
}
