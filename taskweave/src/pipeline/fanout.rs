//! Fan-out/fan-in resolution of mapping and sequence groups.
//!
//! All members run cooperatively inside the calling task: each one is polled
//! once, in declaration order, before any completion is consumed, and the
//! rest are driven through a [`FuturesUnordered`]. Results are placed by key
//! or position, so completion order never affects the output.

use super::compile::{fold_results, Group};
use super::config::DiscardPolicy;
use crate::errors::Failure;
use crate::tasks::Args;
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::task::Poll;
use tracing::{debug, warn};

/// Runs every member of `group` against `args` and assembles the results.
///
/// On success the result vector holds exactly one value: the mapping object
/// or sequence array. The first member failure wins; if the group has a
/// recovery handler and the failure is still recoverable, the handler's
/// outcome becomes the group's outcome.
pub(crate) async fn resolve(group: &Group, args: Args) -> Result<Args, Failure> {
    let failure = match collect(group, &args).await {
        Ok(container) => return Ok(vec![container]),
        Err(failure) => failure,
    };

    match group.recovery {
        Some(ref recovery) if failure.is_recoverable() => {
            warn!(
                group = group.layout.label(),
                handler = recovery.name(),
                error = %failure.error,
                "Fan-out member failed; invoking recovery"
            );
            recovery.run(&failure).await
        }
        _ => Err(failure),
    }
}

async fn collect(group: &Group, args: &Args) -> Result<Value, Failure> {
    let mut slots: Vec<Option<Value>> = vec![None; group.members.len()];
    let mut pending = FuturesUnordered::new();
    let mut first_failure = None;

    for (index, member) in group.members.iter().enumerate() {
        let mut run = member.run(args.clone());
        match futures::poll!(&mut run) {
            Poll::Ready(Ok(results)) => slots[index] = Some(fold_results(results)),
            Poll::Ready(Err(failure)) => {
                first_failure.get_or_insert(failure);
            }
            Poll::Pending => pending.push(async move { (index, run.await) }),
        }
    }

    if let Some(failure) = first_failure {
        discard(group.discard, pending);
        return Err(failure);
    }

    loop {
        let next = pending.next().await;
        match next {
            None => break,
            Some((index, Ok(results))) => slots[index] = Some(fold_results(results)),
            Some((_, Err(failure))) => {
                discard(group.discard, pending);
                return Err(failure);
            }
        }
    }

    Ok(group.layout.assemble(slots))
}

/// Disposes of siblings that were still running when the group failed.
///
/// Drained siblings go to the ambient runtime and may run on another worker
/// thread under a multi-thread runtime.
fn discard<F>(policy: DiscardPolicy, mut pending: FuturesUnordered<F>)
where
    F: Future + Send + 'static,
    F::Output: Send,
{
    if pending.is_empty() {
        return;
    }

    match (policy, tokio::runtime::Handle::try_current()) {
        (DiscardPolicy::Drain, Ok(handle)) => {
            debug!(count = pending.len(), "Draining abandoned fan-out members");
            drop(handle.spawn(async move {
                while pending.next().await.is_some() {}
            }));
        }
        (DiscardPolicy::Drain, Err(_)) => {
            debug!(
                count = pending.len(),
                "No runtime to drain abandoned fan-out members; dropping them"
            );
        }
        (DiscardPolicy::Drop, _) => {
            debug!(count = pending.len(), "Dropping abandoned fan-out members");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::TaskDescription;
    use crate::errors::TaskError;
    use crate::pipeline::compile::compile;
    use crate::recovery::Recovery;
    use crate::testing::{FailingTask, RecordingTask, YieldingTask};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn run_group(
        description: &TaskDescription,
        recovery: Option<&Recovery>,
        args: Args,
    ) -> impl Future<Output = Result<Args, Failure>> {
        compile(description, recovery, DiscardPolicy::Drain).run(args)
    }

    #[tokio::test]
    async fn test_empty_groups_complete_immediately() {
        let empty_map = TaskDescription::mapping(Vec::<(String, TaskDescription)>::new());
        assert_eq!(run_group(&empty_map, None, vec![json!(1)]).await, Ok(vec![json!({})]));

        let empty_seq = TaskDescription::sequence(vec![]);
        assert_eq!(run_group(&empty_seq, None, vec![]).await, Ok(vec![json!([])]));
    }

    #[tokio::test]
    async fn test_results_keep_position_despite_completion_order() {
        // Earlier members yield more often, so they finish last.
        let description = TaskDescription::sequence(vec![
            TaskDescription::task(YieldingTask::new("slow", 5, json!("a"))),
            TaskDescription::task(YieldingTask::new("mid", 2, json!("b"))),
            TaskDescription::task(YieldingTask::new("fast", 0, json!("c"))),
        ]);

        let out = run_group(&description, None, vec![]).await.unwrap();
        assert_eq!(out, vec![json!(["a", "b", "c"])]);
    }

    #[tokio::test]
    async fn test_member_pending_after_first_pass_still_lands() {
        let description = TaskDescription::sequence(vec![
            TaskDescription::task(YieldingTask::new("later", 1, json!("late"))),
            TaskDescription::from_fn("now", |_args: Args| Ok(vec![json!("now")])),
        ]);

        let out = run_group(&description, None, vec![]).await.unwrap();
        assert_eq!(out, vec![json!(["late", "now"])]);
    }

    #[tokio::test]
    async fn test_members_start_in_declaration_order() {
        let started = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let member = |name: &'static str| {
            let started = started.clone();
            TaskDescription::from_fn(name, move |_args: Args| {
                started.lock().push(name);
                Ok(vec![json!(name)])
            })
        };
        let description = TaskDescription::mapping([
            ("zeta", member("zeta")),
            ("alpha", member("alpha")),
            ("mid", member("mid")),
        ]);

        let out = run_group(&description, None, vec![]).await.unwrap();
        assert_eq!(*started.lock(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(out, vec![json!({"zeta": "zeta", "alpha": "alpha", "mid": "mid"})]);
    }

    #[tokio::test]
    async fn test_mapping_results_keyed() {
        let description = TaskDescription::mapping([
            ("later", TaskDescription::task(YieldingTask::new("later", 3, json!(1)))),
            ("sooner", TaskDescription::task(YieldingTask::new("sooner", 0, json!(2)))),
        ]);

        let out = run_group(&description, None, vec![]).await.unwrap();
        assert_eq!(out, vec![json!({"later": 1, "sooner": 2})]);
    }

    #[tokio::test]
    async fn test_multi_result_member_contributes_array() {
        let description = TaskDescription::sequence(vec![
            TaskDescription::from_fn("pair", |_args: Args| Ok(vec![json!(1), json!(2)])),
            TaskDescription::from_fn("none", |_args: Args| Ok(vec![])),
        ]);

        let out = run_group(&description, None, vec![]).await.unwrap();
        assert_eq!(out, vec![json!([[1, 2], null])]);
    }

    #[tokio::test]
    async fn test_every_member_starts_before_first_failure_is_reported() {
        let recorder = Arc::new(RecordingTask::new("second"));
        let description = TaskDescription::sequence(vec![
            TaskDescription::task(FailingTask::new("first", "E")),
            TaskDescription::Callable(recorder.clone()),
        ]);

        let failure = run_group(&description, None, vec![json!(7)]).await.unwrap_err();
        assert_eq!(failure.error, TaskError::new("E"));
        assert_eq!(recorder.calls(), vec![vec![json!(7)]]);
    }

    #[tokio::test]
    async fn test_failure_without_recovery_discards_pending_sibling() {
        let description = TaskDescription::mapping([
            ("a", TaskDescription::task(FailingTask::new("a", "E"))),
            ("b", TaskDescription::task(YieldingTask::new("b", 3, json!("late")))),
        ]);

        let failure = run_group(&description, None, vec![]).await.unwrap_err();
        assert_eq!(failure.error, TaskError::new("E"));
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let description = TaskDescription::sequence(vec![
            TaskDescription::task(YieldingTask::failing("slow", 4, "second")),
            TaskDescription::task(YieldingTask::failing("fast", 1, "first")),
        ]);

        let failure = run_group(&description, None, vec![]).await.unwrap_err();
        assert_eq!(failure.error, TaskError::new("first"));
    }

    #[tokio::test]
    async fn test_recovery_replaces_group_outcome() {
        let recovery = Recovery::from_fn(|_err, _upstream| Ok(vec![json!(42)]));
        let description = TaskDescription::mapping([
            ("a", TaskDescription::task(FailingTask::new("a", "E"))),
            ("b", TaskDescription::task(YieldingTask::new("b", 1, json!(0)))),
        ]);

        let out = run_group(&description, Some(&recovery), vec![]).await.unwrap();
        assert_eq!(out, vec![json!(42)]);
    }

    #[tokio::test]
    async fn test_failed_recovery_is_fatal_and_not_retried_by_outer_group() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let recovery = Recovery::from_fn(move |_err, _upstream| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(TaskError::new("recovery broke"))
        });
        let description = TaskDescription::sequence(vec![TaskDescription::sequence(vec![
            TaskDescription::task(FailingTask::new("inner", "E")),
        ])]);

        let failure = run_group(&description, Some(&recovery), vec![]).await.unwrap_err();
        assert_eq!(failure.error, TaskError::new("recovery broke"));
        assert!(!failure.is_recoverable());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drain_lets_abandoned_sibling_finish() {
        let recorder = Arc::new(RecordingTask::new("tail"));
        let tail = crate::pipeline::pipeline(vec![
            TaskDescription::task(YieldingTask::new("wait", 3, json!(null))),
            TaskDescription::Callable(recorder.clone()),
        ]);
        let description = TaskDescription::sequence(vec![
            TaskDescription::task(YieldingTask::failing("fail", 1, "E")),
            TaskDescription::from(tail),
        ]);

        assert!(run_group(&description, None, vec![json!(1)]).await.is_err());
        assert_eq!(recorder.call_count(), 0);

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(recorder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_policy_cancels_abandoned_sibling() {
        let recorder = Arc::new(RecordingTask::new("tail"));
        let tail = crate::pipeline::pipeline(vec![
            TaskDescription::task(YieldingTask::new("wait", 3, json!(null))),
            TaskDescription::Callable(recorder.clone()),
        ]);
        let description = TaskDescription::sequence(vec![
            TaskDescription::task(YieldingTask::failing("fail", 1, "E")),
            TaskDescription::from(tail),
        ]);

        let unit = compile(&description, None, DiscardPolicy::Drop);
        assert!(unit.run(vec![json!(1)]).await.is_err());

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(recorder.call_count(), 0);
    }
}
