// storefront/src/services/otp.rs

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

pub const OTP_LEN: usize = 6;

/// A six digit code, zero padded.
pub fn generate_otp() -> String {
  let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
  format!("{:06}", code)
}

pub fn is_well_formed(otp: &str) -> bool {
  otp.len() == OTP_LEN && otp.chars().all(|c| c.is_ascii_digit())
}

pub fn expiry_from(now: DateTime<Utc>, ttl_minutes: i64) -> DateTime<Utc> {
  now + Duration::minutes(ttl_minutes)
}
