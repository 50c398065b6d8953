//! Test assertions for flow outcomes.

use crate::errors::Failure;
use crate::tasks::Args;
use serde_json::Value;

/// Asserts that the outcome is a success.
pub fn assert_succeeded(outcome: &Result<Args, Failure>) {
    assert!(
        outcome.is_ok(),
        "Expected success, got failure: {:?}",
        outcome.as_ref().err()
    );
}

/// Asserts that the outcome is a success with exactly these results.
pub fn assert_succeeded_with(outcome: &Result<Args, Failure>, expected: &[Value]) {
    match outcome {
        Ok(results) => assert_eq!(
            results.as_slice(),
            expected,
            "Expected results {expected:?}, got {results:?}"
        ),
        Err(failure) => panic!("Expected results {expected:?}, got failure: {failure:?}"),
    }
}

/// Asserts that the outcome is a failure with this error message.
pub fn assert_failed_with(outcome: &Result<Args, Failure>, message: &str) {
    match outcome {
        Ok(results) => panic!("Expected failure '{message}', got results: {results:?}"),
        Err(failure) => assert_eq!(
            failure.error.message, message,
            "Expected error message '{}', got '{}'",
            message, failure.error.message
        ),
    }
}

/// Asserts that the outcome is a failure that skips further recovery.
pub fn assert_fatal(outcome: &Result<Args, Failure>) {
    match outcome {
        Ok(results) => panic!("Expected fatal failure, got results: {results:?}"),
        Err(failure) => assert!(
            failure.skip_recovery,
            "Expected failure to skip recovery: {failure:?}"
        ),
    }
}
