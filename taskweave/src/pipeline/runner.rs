//! Serial execution of a compiled flow.

use super::composed::Pipeline;
use super::compile::Unit;
use crate::errors::Failure;
use crate::events::EventKind;
use crate::observability::SpanTimer;
use crate::tasks::Args;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

/// Per-invocation state. Never shared between invocations.
#[derive(Debug)]
pub(crate) struct RunState {
    pub(crate) run_id: Uuid,
    original: Args,
    last: Option<Args>,
}

impl RunState {
    fn new(args: Args) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            original: args,
            last: None,
        }
    }

    /// Number of arguments the flow was invoked with; the arity threshold
    /// for error middleware.
    pub(crate) fn arg_count(&self) -> usize {
        self.original.len()
    }

    /// Arguments for the next step.
    fn input(&self, transform: bool) -> Args {
        match (&self.last, transform) {
            (Some(last), true) => last.clone(),
            _ => self.original.clone(),
        }
    }

    fn advance(&mut self, results: Args) {
        self.last = Some(results);
    }

    /// Final result: the last output when transforming, otherwise the
    /// invocation arguments.
    fn finish(self, transform: bool) -> Args {
        match (self.last, transform) {
            (Some(last), true) => last,
            _ => self.original,
        }
    }
}

impl Pipeline {
    /// Runs every step in order, handing failures to the dispatcher.
    pub(crate) async fn run(&self, args: Args) -> Result<Args, Failure> {
        let state = RunState::new(args);
        let span = tracing::debug_span!(
            "flow.invoke",
            flow = %self.config.name,
            run_id = %state.run_id,
            steps = self.units.len(),
        );
        self.execute(state).instrument(span).await
    }

    async fn execute(&self, mut state: RunState) -> Result<Args, Failure> {
        let run_id = state.run_id;
        let timer = SpanTimer::start(self.config.name.clone(), run_id);
        self.emit(self.event(EventKind::FlowStarted, run_id));

        let mut index = 0;
        while let Some(unit) = self.units.get(index) {
            if self.skips(unit, &state) {
                debug!(step = index, unit = unit.name(), "Skipping error middleware");
                self.emit(self.event(EventKind::StepSkipped, run_id).with_step(index, unit.name()));
                index += 1;
                continue;
            }

            self.emit(self.event(EventKind::StepStarted, run_id).with_step(index, unit.name()));
            match unit.run(state.input(self.config.transform)).await {
                Ok(results) => {
                    self.emit(
                        self.event(EventKind::StepCompleted, run_id)
                            .with_step(index, unit.name()),
                    );
                    state.advance(results);
                    index += 1;
                }
                Err(failure) => {
                    warn!(step = index, unit = unit.name(), error = %failure.error, "Step failed");
                    self.emit(
                        self.event(EventKind::StepFailed, run_id)
                            .with_step(index, unit.name())
                            .with_error(&failure.error),
                    );

                    match self.dispatch(&state, index, failure).await {
                        Ok(resume) => {
                            debug!(resume_at = resume.next, "Resuming after recovery");
                            state.advance(resume.results);
                            index = resume.next;
                        }
                        Err(failure) => {
                            self.emit(
                                self.event(EventKind::FlowFailed, run_id).with_error(&failure.error),
                            );
                            timer.finish("failed");
                            return Err(failure);
                        }
                    }
                }
            }
        }

        self.emit(self.event(EventKind::FlowCompleted, run_id));
        timer.finish("completed");
        Ok(state.finish(self.config.transform))
    }

    /// Error middleware only runs on failure paths.
    fn skips(&self, unit: &Unit, state: &RunState) -> bool {
        self.config.fixed && unit.is_error_middleware(state.arg_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_run_state_inputs() {
        let mut state = RunState::new(vec![json!(1)]);
        assert_eq!(state.arg_count(), 1);
        assert_eq!(state.input(true), vec![json!(1)]);

        state.advance(vec![json!(2), json!(3)]);
        assert_eq!(state.input(true), vec![json!(2), json!(3)]);
        assert_eq!(state.input(false), vec![json!(1)]);
        assert_eq!(state.finish(true), vec![json!(2), json!(3)]);
    }

    #[test]
    fn test_run_state_without_transform_finishes_with_original() {
        let mut state = RunState::new(vec![json!(1)]);
        state.advance(vec![json!(2)]);
        assert_eq!(state.finish(false), vec![json!(1)]);
    }

    #[test]
    fn test_run_state_without_steps_returns_original() {
        let state = RunState::new(vec![json!("x")]);
        assert_eq!(state.finish(true), vec![json!("x")]);
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunState::new(vec![]).run_id, RunState::new(vec![]).run_id);
    }
}
