// tests/error_handling_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storeflow::{Control, Flow, FlowError, Outcome, Shared};

#[tokio::test]
#[serial]
async fn required_step_without_handlers_fails_the_run() {
  setup_tracing();
  let flow = Flow::<OrderDraft, TestError>::new("checkout", &["commit"]);
  let err = flow.run(Shared::new(OrderDraft::default())).await.unwrap_err();

  match err {
    TestError::Engine(message) => {
      assert!(message.contains("MissingHandler"));
      assert!(message.contains("commit"));
    }
    other => panic!("expected an engine error, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn flow_can_use_flow_error_directly() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, FlowError>::new("plain", &["work", "explode"]);
  flow.on("work", |ctx: Shared<OrderDraft>| async move {
    ctx.write().total_cents = 10;
    Ok::<_, FlowError>(Control::Continue)
  });
  flow.on("explode", |_ctx: Shared<OrderDraft>| async move {
    Err::<Control, _>(anyhow::anyhow!("payment gateway unreachable"))
  });

  let ctx = Shared::new(OrderDraft::default());
  let err = flow.run(ctx.clone()).await.unwrap_err();

  assert!(matches!(err, FlowError::Handler { .. }));
  assert!(err.to_string().contains("payment gateway unreachable"));
  assert_eq!(ctx.read().total_cents, 10);
}

#[tokio::test]
#[serial]
async fn handler_errors_convert_into_the_flow_error_type() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("convert", &["engine_failure"]);
  flow.on("engine_failure", |_ctx: Shared<OrderDraft>| async move {
    Err::<Control, FlowError>(FlowError::ContextMismatch {
      expected: "CartCtx".to_string(),
    })
  });

  let err = flow.run(Shared::new(OrderDraft::default())).await.unwrap_err();
  assert!(matches!(err, TestError::Engine(ref m) if m.contains("ContextMismatch")));
}

#[tokio::test]
#[serial]
async fn error_in_before_phase_skips_on_and_after() {
  setup_tracing();
  let mut flow = Flow::<OrderDraft, TestError>::new("guarded", &["persist"]);
  flow.before("persist", reject("guard", "not allowed"));
  flow.on("persist", record("persist"));
  flow.after("persist", record("after"));

  let ctx = Shared::new(OrderDraft::default());
  let result = flow.run(ctx.clone()).await;

  assert!(result.is_err());
  assert_ne!(result.ok(), Some(Outcome::Completed));
  assert_eq!(ctx.read().trail, vec!["guard"]);
}
