//! Testing utilities for composed flows.
//!
//! This module provides:
//! - Mock tasks that record, fail or yield a set number of times
//! - Assertions for flow outcomes

mod assertions;
mod mocks;

pub use assertions::{assert_failed_with, assert_fatal, assert_succeeded, assert_succeeded_with};
pub use mocks::{FailingTask, RecordingTask, YieldingTask};
