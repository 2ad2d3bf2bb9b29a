// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use storeflow::{Control, FlowError, Handler, Shared};
use tracing::Level;

/// A cut-down order being assembled by test flows.
#[derive(Clone, Debug, Default)]
pub struct OrderDraft {
  pub lines: Vec<(String, i64, i32)>,
  pub total_cents: i64,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
}

impl OrderDraft {
  pub fn with_lines(lines: &[(&str, i64, i32)]) -> Self {
    Self {
      lines: lines.iter().map(|(n, p, q)| (n.to_string(), *p, *q)).collect(),
      ..Default::default()
    }
  }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("engine: {0}")]
  Engine(String),

  #[error("rejected: {0}")]
  Rejected(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Engine(format!("{:?}", err))
  }
}

/// Appends `label` to the trail and stops if the draft asks for it.
pub fn record(label: &'static str) -> Handler<OrderDraft, TestError> {
  Box::new(move |ctx: Shared<OrderDraft>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.trail.push(label.to_string());
      if guard.stop_at.as_deref() == Some(label) {
        return Ok(Control::Stop);
      }
      Ok(Control::Continue)
    })
  })
}

pub fn reject(label: &'static str, reason: &'static str) -> Handler<OrderDraft, TestError> {
  Box::new(move |ctx: Shared<OrderDraft>| {
    Box::pin(async move {
      ctx.write().trail.push(label.to_string());
      Err(TestError::Rejected(reason.to_string()))
    })
  })
}

/// Sums the draft lines, yielding once in between to exercise real awaits.
pub fn total_lines() -> Handler<OrderDraft, TestError> {
  Box::new(|ctx: Shared<OrderDraft>| {
    Box::pin(async move {
      let lines = ctx.read().lines.clone();
      tokio::task::yield_now().await;
      let total = lines.iter().map(|(_, price, qty)| price * i64::from(*qty)).sum();
      let mut guard = ctx.write();
      guard.total_cents = total;
      guard.trail.push("total".to_string());
      Ok(Control::Continue)
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
