// tests/shared_context_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storeflow::{Control, Flow, Shared};

#[tokio::test]
#[serial]
async fn writes_in_one_step_are_visible_to_the_next() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("handoff", &["price", "discount"]);
  flow.on("price", total_lines());
  flow.on("discount", |ctx: Shared<OrderDraft>| async move {
    let mut guard = ctx.write();
    assert_eq!(guard.total_cents, 20_000);
    guard.total_cents -= 1_000;
    Ok::<_, TestError>(Control::Continue)
  });

  let ctx = Shared::new(OrderDraft::with_lines(&[("Gold Phantom", 10_000, 2)]));
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().total_cents, 19_000);
}

#[test]
fn clones_share_one_value() {
  let original = Shared::new(OrderDraft::default());
  let clone = original.clone();

  original.write().total_cents = 5;
  assert_eq!(clone.read().total_cents, 5);

  clone.write().trail.push("from clone".to_string());
  assert_eq!(original.read().trail, vec!["from clone"]);
}

#[test]
fn try_write_fails_while_a_reader_holds_the_lock() {
  let ctx = Shared::new(OrderDraft::default());
  let reader = ctx.read();
  assert!(ctx.try_write().is_none());
  assert!(ctx.try_read().is_some());
  drop(reader);
  assert!(ctx.try_write().is_some());
}

#[test]
fn mapped_guards_narrow_to_one_field() {
  let ctx = Shared::new(OrderDraft::with_lines(&[("Mania", 79_000, 1)]));
  {
    let mut lines = ctx.map_write(|draft| &mut draft.lines);
    lines.push(("Dione".to_string(), 219_000, 1));
  }
  assert_eq!(ctx.map_read(|draft| &draft.lines).len(), 2);
}

#[test]
fn into_inner_only_succeeds_for_the_last_handle() {
  let ctx = Shared::new(OrderDraft {
    total_cents: 42,
    ..Default::default()
  });
  let extra = ctx.clone();

  let ctx = ctx.into_inner().expect_err("another handle is alive");
  drop(extra);
  let draft = ctx.into_inner().expect("last handle");
  assert_eq!(draft.total_cents, 42);
}
