// storefront/src/services/mail.rs

//! Outgoing mail: a `Mailer` seam with an SMTP implementation and a logging
//! one used when no relay is configured.

use crate::config::SmtpConfig;
use crate::errors::AppError;
use crate::models::{Order, OrderItem};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use parking_lot::Mutex;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
  pub to: String,
  pub reply_to: Option<String>,
  pub subject: String,
  pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, message: MailMessage) -> Result<(), AppError>;
}

pub struct SmtpMailer {
  from: Mailbox,
  transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
  pub fn new(config: &SmtpConfig, from_address: &str) -> Result<Self, AppError> {
    let from: Mailbox = from_address
      .parse()
      .map_err(|e| AppError::Config(format!("Invalid MAIL_FROM_ADDRESS: {}", e)))?;

    // 465 is implicit TLS, anything else negotiates STARTTLS.
    let builder = if config.port == 465 {
      AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
    } else {
      AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
    }
    .map_err(|e| AppError::Config(format!("Invalid SMTP host: {}", e)))?;

    let mut builder = builder.port(config.port);
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
      builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(Self {
      from,
      transport: builder.build(),
    })
  }

  fn build_message(&self, message: &MailMessage) -> Result<Message, AppError> {
    let to: Mailbox = message
      .to
      .parse()
      .map_err(|e| AppError::Mail(format!("Invalid recipient address: {}", e)))?;

    let mut builder = Message::builder().from(self.from.clone()).to(to).subject(&message.subject);
    if let Some(reply_to) = &message.reply_to {
      let reply_to: Mailbox = reply_to
        .parse()
        .map_err(|e| AppError::Mail(format!("Invalid reply-to address: {}", e)))?;
      builder = builder.reply_to(reply_to);
    }
    builder
      .header(ContentType::TEXT_PLAIN)
      .body(message.body.clone())
      .map_err(|e| AppError::Mail(format!("Failed to build message: {}", e)))
  }
}

#[async_trait]
impl Mailer for SmtpMailer {
  #[instrument(name = "SmtpMailer::send", skip_all, fields(to = %message.to, subject = %message.subject), err(Display))]
  async fn send(&self, message: MailMessage) -> Result<(), AppError> {
    let email = self.build_message(&message)?;
    self
      .transport
      .send(email)
      .await
      .map_err(|e| AppError::Mail(format!("SMTP delivery failed: {}", e)))?;
    info!("Mail delivered.");
    Ok(())
  }
}

/// Writes mails to the log and keeps them in memory.
#[derive(Default)]
pub struct LogMailer {
  sent: Mutex<Vec<MailMessage>>,
}

impl LogMailer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sent(&self) -> Vec<MailMessage> {
    self.sent.lock().clone()
  }
}

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, message: MailMessage) -> Result<(), AppError> {
    info!(to = %message.to, subject = %message.subject, "Mail (log only):\n{}", message.body);
    self.sent.lock().push(message);
    Ok(())
  }
}

pub fn otp_mail(to: &str, user_name: &str, otp: &str, ttl_minutes: i64) -> MailMessage {
  MailMessage {
    to: to.to_string(),
    reply_to: None,
    subject: "Password Reset OTP".to_string(),
    body: format!(
      "Hello {},\n\nYour password reset code is: {}\n\nThe code expires in {} minutes. \
       If you did not ask to reset your password, you can ignore this email.\n",
      user_name, otp, ttl_minutes
    ),
  }
}

pub struct ContactDetails<'a> {
  pub name: &'a str,
  pub email: &'a str,
  pub phone: Option<&'a str>,
  pub subject: &'a str,
  pub message: &'a str,
}

pub fn contact_mail(to: &str, details: &ContactDetails<'_>) -> MailMessage {
  MailMessage {
    to: to.to_string(),
    reply_to: Some(details.email.to_string()),
    subject: format!("Contact form: {}", details.subject),
    body: format!(
      "Name: {}\nEmail: {}\nPhone: {}\nSubject: {}\n\n{}\n",
      details.name,
      details.email,
      details.phone.unwrap_or("-"),
      details.subject,
      details.message
    ),
  }
}

pub fn format_cents(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let cents = cents.abs();
  format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

pub fn order_confirmation_mail(order: &Order, items: &[OrderItem], base_url: &str) -> MailMessage {
  let lines: Vec<String> = items
    .iter()
    .map(|item| {
      format!(
        "  {} x {} @ {} = {}",
        item.quantity,
        item.product_name,
        format_cents(item.price_cents),
        format_cents(item.subtotal_cents)
      )
    })
    .collect();

  MailMessage {
    to: order.customer_email.clone(),
    reply_to: None,
    subject: format!("Order {} confirmed", order.order_number),
    body: format!(
      "Hello {},\n\nThank you for your order {}.\n\n{}\n\nSubtotal: {}\nShipping: {}\nTotal: {}\n\n\
       Delivery address: {}\nPayment method: {:?}\n\nTrack your order at {}/orders/{}\n",
      order.customer_name,
      order.order_number,
      lines.join("\n"),
      format_cents(order.subtotal_cents),
      format_cents(order.shipping_fee_cents),
      format_cents(order.total_cents),
      order.customer_address,
      order.payment_method,
      base_url.trim_end_matches('/'),
      order.id
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cents_are_formatted_as_dollars() {
    assert_eq!(format_cents(399_000), "$3990.00");
    assert_eq!(format_cents(5), "$0.05");
    assert_eq!(format_cents(-150), "-$1.50");
  }

  #[test]
  fn otp_mail_carries_code_and_lifetime() {
    let mail = otp_mail("lan@example.com", "Lan Nguyen", "004217", 10);
    assert_eq!(mail.to, "lan@example.com");
    assert!(mail.body.contains("004217"));
    assert!(mail.body.contains("10 minutes"));
  }

  #[test]
  fn contact_mail_replies_to_the_sender() {
    let details = ContactDetails {
      name: "Minh",
      email: "minh@example.com",
      phone: None,
      subject: "Warranty",
      message: "My Phantom hums.",
    };
    let mail = contact_mail("support@example.com", &details);
    assert_eq!(mail.reply_to.as_deref(), Some("minh@example.com"));
    assert!(mail.body.contains("Phone: -"));
  }

  #[tokio::test]
  async fn log_mailer_records_messages() {
    let mailer = LogMailer::new();
    mailer.send(otp_mail("a@example.com", "A", "123456", 10)).await.unwrap();
    assert_eq!(mailer.sent().len(), 1);
  }

  #[test]
  fn smtp_mailer_rejects_bad_sender() {
    let config = SmtpConfig {
      host: "smtp.example.com".to_string(),
      port: 587,
      username: None,
      password: None,
    };
    assert!(matches!(SmtpMailer::new(&config, "not an address"), Err(AppError::Config(_))));
  }
}
