// tests/flow_execution_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storeflow::{Control, Flow, Outcome, Shared};

#[tokio::test]
#[serial]
async fn steps_run_in_declaration_order() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("place", &["validate", "price", "persist"]);
  flow.on("validate", record("validate"));
  flow.on("price", total_lines());
  flow.on("persist", record("persist"));

  let ctx = Shared::new(OrderDraft::with_lines(&[("Phantom I", 399_000, 1), ("Mania", 79_000, 2)]));
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, Outcome::Completed);
  let guard = ctx.read();
  assert_eq!(guard.total_cents, 557_000);
  assert_eq!(guard.trail, vec!["validate", "total", "persist"]);
}

#[tokio::test]
#[serial]
async fn phases_run_before_on_after() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("phases", &["only"]);
  flow.after("only", record("after"));
  flow.on("only", record("on-1"));
  flow.before("only", record("before"));
  flow.on("only", record("on-2"));

  let ctx = Shared::new(OrderDraft::default());
  flow.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().trail, vec!["before", "on-1", "on-2", "after"]);
}

#[tokio::test]
#[serial]
async fn stop_halts_the_rest_of_the_flow() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("stop", &["a", "b", "c"]);
  flow.on("a", record("a"));
  flow.on("b", record("b"));
  flow.after("b", record("b-after"));
  flow.on("c", record("c"));

  let ctx = Shared::new(OrderDraft {
    stop_at: Some("b".to_string()),
    ..Default::default()
  });
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, Outcome::Stopped);
  assert_eq!(ctx.read().trail, vec!["a", "b"]);
}

#[tokio::test]
#[serial]
async fn first_error_is_returned_and_later_steps_do_not_run() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("fail", &["validate", "stock", "persist"]);
  flow.on("validate", record("validate"));
  flow.on("stock", reject("stock", "Product Phantom I is out of stock"));
  flow.on("persist", record("persist"));

  let ctx = Shared::new(OrderDraft::default());
  let err = flow.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Rejected("Product Phantom I is out of stock".to_string()));
  assert_eq!(ctx.read().trail, vec!["validate", "stock"]);
}

#[tokio::test]
#[serial]
async fn skip_condition_bypasses_every_phase_of_the_step() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("skip", &["price", "notify"]);
  flow.on("price", total_lines());
  flow.before("notify", record("notify-before"));
  flow.on("notify", record("notify"));
  flow.skip_when("notify", |draft: &OrderDraft| draft.total_cents == 0);

  let ctx = Shared::new(OrderDraft::default());
  let outcome = flow.run(ctx.clone()).await.unwrap();

  assert_eq!(outcome, Outcome::Completed);
  assert_eq!(ctx.read().trail, vec!["total"]);
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_passed_over() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("optional", &["persist", "confirmation_mail"]);
  flow.optional("confirmation_mail");
  flow.on("persist", record("persist"));

  let ctx = Shared::new(OrderDraft::default());
  assert_eq!(flow.run(ctx.clone()).await.unwrap(), Outcome::Completed);
  assert_eq!(ctx.read().trail, vec!["persist"]);
}

#[tokio::test]
#[serial]
async fn structural_edits_change_the_step_order() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("edit", &["validate", "persist"]);
  flow.insert_after("validate", "price").insert_before("validate", "load").remove_step("persist");
  assert_eq!(flow.step_names(), vec!["load", "validate", "price"]);

  flow.on("load", record("load"));
  flow.on("validate", record("validate"));
  flow.on("price", |ctx: Shared<OrderDraft>| async move {
    ctx.write().trail.push("price".to_string());
    Ok::<_, TestError>(Control::Continue)
  });

  let ctx = Shared::new(OrderDraft::default());
  flow.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().trail, vec!["load", "validate", "price"]);
}

#[test]
#[should_panic(expected = "no step named 'pesrist'")]
fn registering_on_an_unknown_step_panics() {
  let mut flow = Flow::<OrderDraft, TestError>::new("typo", &["persist"]);
  flow.on("pesrist", record("persist"));
}

#[test]
#[should_panic(expected = "already has a step named 'persist'")]
fn duplicate_step_names_panic() {
  let _ = Flow::<OrderDraft, TestError>::new("dup", &["persist", "persist"]);
}
