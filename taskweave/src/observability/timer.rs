//! Wall-clock timing for flow invocations.

use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Times one invocation of a flow and logs how it ended.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    flow: String,
    run_id: Uuid,
}

impl SpanTimer {
    /// Starts timing run `run_id` of `flow`.
    #[must_use]
    pub fn start(flow: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            start: Instant::now(),
            flow: flow.into(),
            run_id,
        }
    }

    /// Milliseconds since the timer started.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Name of the timed flow.
    #[must_use]
    pub fn flow(&self) -> &str {
        &self.flow
    }

    /// Logs `outcome` with the elapsed time and returns the milliseconds.
    pub fn finish(self, outcome: &str) -> f64 {
        let elapsed_ms = self.elapsed_ms();
        debug!(
            flow = %self.flow,
            run_id = %self.run_id,
            elapsed_ms,
            "Flow {outcome}"
        );
        elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("flow", Uuid::new_v4());
        assert_eq!(timer.flow(), "flow");
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(timer.elapsed_ms() >= 1.0);
        assert!(timer.finish("completed") >= 1.0);
    }
}
