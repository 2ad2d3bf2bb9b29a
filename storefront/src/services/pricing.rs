// storefront/src/services/pricing.rs

//! Money and order arithmetic used by cart and checkout. All amounts are
//! integer cents.

use crate::errors::AppError;
use crate::models::CartLine;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

/// The minimum a line needs to be priced and checked against stock.
pub trait PricedLine {
  fn name(&self) -> &str;
  fn unit_price_cents(&self) -> i64;
  fn quantity(&self) -> i32;
  fn available_stock(&self) -> i32;

  fn subtotal_cents(&self) -> Result<i64, AppError> {
    self
      .unit_price_cents()
      .checked_mul(i64::from(self.quantity()))
      .ok_or_else(total_too_large)
  }
}

impl PricedLine for CartLine {
  fn name(&self) -> &str {
    &self.product_name
  }

  fn unit_price_cents(&self) -> i64 {
    self.price_cents
  }

  fn quantity(&self) -> i32 {
    self.quantity
  }

  fn available_stock(&self) -> i32 {
    self.product_stock
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
  pub subtotal_cents: i64,
  pub shipping_fee_cents: i64,
  pub total_cents: i64,
}

/// Highest accepted unit price, `99999999.99`.
pub const MAX_PRICE_CENTS: i64 = 9_999_999_999;

pub const TOTAL_TOO_LARGE: &str = "Order total is too large.";

fn total_too_large() -> AppError {
  AppError::BadRequest(TOTAL_TOO_LARGE.to_string())
}

pub fn price_lines<L: PricedLine>(lines: &[L], shipping_fee_cents: i64) -> Result<OrderTotals, AppError> {
  let mut subtotal_cents: i64 = 0;
  for line in lines {
    subtotal_cents = subtotal_cents
      .checked_add(line.subtotal_cents()?)
      .ok_or_else(total_too_large)?;
  }
  let total_cents = subtotal_cents
    .checked_add(shipping_fee_cents)
    .ok_or_else(total_too_large)?;
  Ok(OrderTotals {
    subtotal_cents,
    shipping_fee_cents,
    total_cents,
  })
}

/// Fails on the first line asking for more than is in stock.
pub fn ensure_in_stock<L: PricedLine>(lines: &[L]) -> Result<(), AppError> {
  match lines.iter().find(|line| line.available_stock() < line.quantity()) {
    Some(line) => Err(out_of_stock(line.name())),
    None => Ok(()),
  }
}

pub fn out_of_stock(product_name: &str) -> AppError {
  AppError::BadRequest(format!("Product {} is out of stock", product_name))
}

/// `ORD` + `YYYYMMDD` + six uppercase hex characters.
pub fn order_number_at<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
  let suffix: u32 = rng.gen_range(0..=0xFF_FFFF);
  format!("ORD{}{:06X}", now.format("%Y%m%d"), suffix)
}

pub fn new_order_number() -> String {
  order_number_at(Utc::now(), &mut rand::thread_rng())
}

/// Parses a decimal price such as `"3990"`, `"3990.5"` or `"2490.00"` into
/// cents. More than two decimals, signs, exponents and anything above
/// [`MAX_PRICE_CENTS`] are rejected.
pub fn parse_price_to_cents(raw: &str) -> Result<i64, String> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err("The price field is required.".to_string());
  }
  let invalid = || "The price must be a number.".to_string();
  let too_large = || "The price may not be greater than 99999999.99.".to_string();

  let (whole, fraction) = match raw.split_once('.') {
    Some((whole, fraction)) => (whole, fraction),
    None => (raw, ""),
  };
  if whole.is_empty() && fraction.is_empty() {
    return Err(invalid());
  }
  if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
    if raw.starts_with('-') {
      return Err("The price must be at least 0.".to_string());
    }
    return Err(invalid());
  }
  if fraction.len() > 2 {
    return Err("The price may not have more than 2 decimal places.".to_string());
  }

  // All digits at this point, so a failed parse is an overflow.
  let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| too_large())? };
  let fraction_cents: i64 = match fraction.len() {
    0 => 0,
    1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
    _ => fraction.parse().map_err(|_| invalid())?,
  };
  let cents = whole
    .checked_mul(100)
    .and_then(|cents| cents.checked_add(fraction_cents))
    .ok_or_else(too_large)?;
  if cents > MAX_PRICE_CENTS {
    return Err(too_large());
  }
  Ok(cents)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  struct Line {
    name: &'static str,
    price: i64,
    qty: i32,
    stock: i32,
  }

  impl PricedLine for Line {
    fn name(&self) -> &str {
      self.name
    }
    fn unit_price_cents(&self) -> i64 {
      self.price
    }
    fn quantity(&self) -> i32 {
      self.qty
    }
    fn available_stock(&self) -> i32 {
      self.stock
    }
  }

  fn line(name: &'static str, price: i64, qty: i32, stock: i32) -> Line {
    Line { name, price, qty, stock }
  }

  #[test]
  fn totals_sum_lines_and_add_shipping() {
    let lines = [line("Phantom I", 399_000, 1, 15), line("Mania", 79_000, 2, 50)];
    let totals = price_lines(&lines, 0).unwrap();
    assert_eq!(totals.subtotal_cents, 557_000);
    assert_eq!(totals.total_cents, 557_000);

    let with_fee = price_lines(&lines, 1_500).unwrap();
    assert_eq!(with_fee.total_cents, 558_500);
  }

  #[test]
  fn empty_cart_prices_to_zero() {
    let totals = price_lines::<Line>(&[], 0).unwrap();
    assert_eq!(totals.subtotal_cents, 0);
  }

  #[test]
  fn overflowing_totals_are_rejected() {
    let huge = [line("Phantom I", i64::MAX / 2 + 1, 2, 10)];
    match price_lines(&huge, 0) {
      Err(AppError::BadRequest(message)) => assert_eq!(message, TOTAL_TOO_LARGE),
      other => panic!("expected a rejected total, got {:?}", other),
    }

    let two_lines = [line("Dione", i64::MAX - 10, 1, 5), line("Mania", 20, 1, 5)];
    assert!(matches!(price_lines(&two_lines, 0), Err(AppError::BadRequest(_))));

    let at_cap = [line("Expert Pro", MAX_PRICE_CENTS, 1, 5)];
    assert!(matches!(price_lines(&at_cap, i64::MAX), Err(AppError::BadRequest(_))));
  }

  #[test]
  fn capped_price_times_a_huge_quantity_is_rejected_not_wrapped() {
    let lines = [line("Expert Pro", MAX_PRICE_CENTS, i32::MAX, i32::MAX)];
    assert!(matches!(price_lines(&lines, 0), Err(AppError::BadRequest(_))));

    let fits = [line("Expert Pro", MAX_PRICE_CENTS, 1_000, 1_000)];
    assert_eq!(price_lines(&fits, 0).unwrap().total_cents, MAX_PRICE_CENTS * 1_000);
  }

  #[test]
  fn stock_check_names_the_first_short_line() {
    let lines = [line("Dione", 219_000, 2, 30), line("Expert Pro", 649_000, 9, 8), line("Mania", 79_000, 99, 1)];
    match ensure_in_stock(&lines) {
      Err(AppError::BadRequest(message)) => assert_eq!(message, "Product Expert Pro is out of stock"),
      other => panic!("expected out-of-stock, got {:?}", other),
    }
  }

  #[test]
  fn exact_stock_is_enough() {
    assert!(ensure_in_stock(&[line("Expert Pro", 649_000, 8, 8)]).is_ok());
  }

  #[test]
  fn order_number_has_date_and_hex_suffix() {
    let now = Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let number = order_number_at(now, &mut rng);
    assert_eq!(number.len(), 3 + 8 + 6);
    assert!(number.starts_with("ORD20250307"));
    assert!(number[11..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
  }

  #[test]
  fn prices_parse_to_cents() {
    assert_eq!(parse_price_to_cents("3990"), Ok(399_000));
    assert_eq!(parse_price_to_cents("3990.00"), Ok(399_000));
    assert_eq!(parse_price_to_cents("299.5"), Ok(29_950));
    assert_eq!(parse_price_to_cents(" 0.99 "), Ok(99));
    assert_eq!(parse_price_to_cents(".5"), Ok(50));
    assert_eq!(parse_price_to_cents("0"), Ok(0));
  }

  #[test]
  fn bad_prices_are_rejected() {
    assert!(parse_price_to_cents("").is_err());
    assert!(parse_price_to_cents("abc").is_err());
    assert!(parse_price_to_cents("1.234").is_err());
    assert!(parse_price_to_cents("1e5").is_err());
    assert!(parse_price_to_cents(".").is_err());
    assert_eq!(parse_price_to_cents("-5"), Err("The price must be at least 0.".to_string()));
  }

  #[test]
  fn prices_above_the_cap_are_rejected() {
    assert_eq!(parse_price_to_cents("99999999.99"), Ok(MAX_PRICE_CENTS));
    let too_large = Err("The price may not be greater than 99999999.99.".to_string());
    assert_eq!(parse_price_to_cents("100000000"), too_large);
    assert_eq!(parse_price_to_cents("90000000000000000"), too_large);
    assert_eq!(parse_price_to_cents("99999999999999999999"), too_large);
  }
}
