//! Routing of step failures to error middleware and the recovery handler.
//!
//! When fixed arity tracking is on, the steps after the failing one are
//! scanned for error middleware. The first one found is invoked with the
//! error value followed by the failing step's arguments; if it succeeds the
//! flow resumes right after it. A failing middleware replaces the error and
//! the scan goes on. Once no middleware is left, the flow's recovery handler
//! gets the failure. Failures flagged to skip recovery bypass all of this.

use super::composed::Pipeline;
use super::runner::RunState;
use crate::errors::Failure;
use crate::events::EventKind;
use crate::tasks::Args;
use tracing::{debug, warn};

/// Where the flow continues after a successful recovery.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Resume {
    /// Index of the next step to run.
    pub(crate) next: usize,
    /// Output that stands in for the failed step's.
    pub(crate) results: Args,
}

impl Pipeline {
    /// Attempts to recover from a failure raised by step `failed_at`.
    pub(crate) async fn dispatch(
        &self,
        state: &RunState,
        failed_at: usize,
        failure: Failure,
    ) -> Result<Resume, Failure> {
        if !failure.is_recoverable() {
            debug!(step = failed_at, "Failure skips recovery");
            return Err(failure);
        }

        let mut failure = failure;
        let mut resume_at = failed_at + 1;

        if self.config.fixed {
            for (index, unit) in self.units.iter().enumerate().skip(failed_at + 1) {
                if !unit.is_error_middleware(state.arg_count()) {
                    continue;
                }

                debug!(step = index, unit = unit.name(), "Invoking error middleware");
                self.emit(
                    self.event(EventKind::RecoveryInvoked, state.run_id)
                        .with_step(index, unit.name()),
                );

                match unit.run(failure.middleware_args()).await {
                    Ok(results) => {
                        self.emit(
                            self.event(EventKind::RecoverySucceeded, state.run_id)
                                .with_step(index, unit.name()),
                        );
                        return Ok(Resume {
                            next: index + 1,
                            results,
                        });
                    }
                    Err(next) => {
                        warn!(step = index, unit = unit.name(), error = %next.error, "Error middleware failed");
                        self.emit(
                            self.event(EventKind::RecoveryFailed, state.run_id)
                                .with_step(index, unit.name())
                                .with_error(&next.error),
                        );
                        if !next.is_recoverable() {
                            return Err(next);
                        }
                        failure = Failure::new(next.error, failure.upstream);
                        resume_at = index + 1;
                    }
                }
            }
        }

        let Some(recovery) = self.recovery.as_ref() else {
            return Err(failure);
        };

        debug!(handler = recovery.name(), "Invoking recovery handler");
        self.emit(self.event(EventKind::RecoveryInvoked, state.run_id).with_unit(recovery.name()));

        match recovery.run(&failure).await {
            Ok(results) => {
                self.emit(
                    self.event(EventKind::RecoverySucceeded, state.run_id)
                        .with_unit(recovery.name()),
                );
                Ok(Resume {
                    next: resume_at,
                    results,
                })
            }
            Err(fatal) => {
                warn!(handler = recovery.name(), error = %fatal.error, "Recovery handler failed");
                self.emit(
                    self.event(EventKind::RecoveryFailed, state.run_id)
                        .with_unit(recovery.name())
                        .with_error(&fatal.error),
                );
                Err(fatal)
            }
        }
    }
}
