// src/flow/execution.rs

use crate::core::control::{Control, Outcome};
use crate::core::handler::Handler;
use crate::core::shared::Shared;
use crate::error::FlowError;
use crate::flow::definition::Flow;
use tracing::{event, instrument, Instrument, Level};

impl<T, E> Flow<T, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx`.
  ///
  /// A skipped step runs nothing. A required step with no handlers fails the
  /// run with `FlowError::MissingHandler`. Within a step the phases run
  /// `before`, `on`, `after`; the first `Control::Stop` ends the run with
  /// `Outcome::Stopped` and the first error is returned as is.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(flow = %self.name, steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: Shared<T>) -> Result<Outcome, E> {
    event!(Level::DEBUG, "flow starting");

    for (step_idx, step) in self.steps.iter().enumerate() {
      let step_name = step.name.as_str();
      let step_span = tracing::info_span!("flow_step", step = step_name, index = step_idx);

      if step.should_skip(&ctx) {
        event!(parent: &step_span, Level::DEBUG, "step skipped by its condition");
        continue;
      }

      if !self.has_handlers(step_name) {
        if step.optional {
          event!(parent: &step_span, Level::DEBUG, "optional step has no handlers");
          continue;
        }
        event!(parent: &step_span, Level::ERROR, "required step has no handlers");
        return Err(E::from(FlowError::MissingHandler {
          flow: self.name.clone(),
          step: step.name.clone(),
        }));
      }

      let control = async {
        for (phase, handlers) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
          if let Some(handlers) = handlers.get(step_name) {
            if run_phase(phase, handlers, &ctx).await? == Control::Stop {
              return Ok::<_, E>(Control::Stop);
            }
          }
        }
        Ok(Control::Continue)
      }
      .instrument(step_span)
      .await?;

      if control == Control::Stop {
        event!(Level::INFO, step = step_name, "flow stopped by a handler");
        return Ok(Outcome::Stopped);
      }
    }

    event!(Level::DEBUG, "flow completed");
    Ok(Outcome::Completed)
  }
}

async fn run_phase<T, E>(phase: &'static str, handlers: &[Handler<T, E>], ctx: &Shared<T>) -> Result<Control, E>
where
  T: 'static + Send + Sync,
  E: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler) in handlers.iter().enumerate() {
    match handler(ctx.clone()).await {
      Ok(Control::Continue) => {}
      Ok(Control::Stop) => {
        event!(Level::DEBUG, phase, handler = handler_idx, "handler requested stop");
        return Ok(Control::Stop);
      }
      Err(e) => {
        event!(Level::WARN, phase, handler = handler_idx, error = %e, "handler failed");
        return Err(e);
      }
    }
  }
  Ok(Control::Continue)
}
