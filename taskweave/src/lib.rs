//! # Taskweave
//!
//! Compose asynchronous tasks into larger units of work.
//!
//! Taskweave takes a list of task descriptions and builds a single composed
//! flow out of them, with support for:
//!
//! - **Serial steps**: run one after another, each seeing either the original
//!   arguments or the previous step's output
//! - **Fan-out groups**: keyed mappings and ordered sequences whose members run
//!   concurrently and whose results keep their keys or positions
//! - **Error recovery**: a flow-wide recovery handler plus arity-based error
//!   middleware that can resume the flow after a failure
//! - **Nesting**: a composed flow is itself a valid step
//! - **Event-driven observability**: lifecycle events and `tracing` spans
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use taskweave::prelude::*;
//! use serde_json::json;
//!
//! let inc = TaskDescription::from_fn("inc", |args: Args| {
//!     Ok(vec![json!(args[0].as_i64().unwrap_or_default() + 1)])
//! });
//! let double = TaskDescription::from_fn("double", |args: Args| {
//!     Ok(vec![json!(args[0].as_i64().unwrap_or_default() * 2)])
//! });
//!
//! let flow = pipeline(vec![inc, double]);
//! assert_eq!(flow.invoke(vec![json!(3)]).await?, vec![json!(8)]);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod description;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod recovery;
pub mod tasks;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::description::{classify, Shape, TaskDescription};
    pub use crate::errors::{ConfigError, Failure, FlowError, TaskError};
    pub use crate::events::{
        CollectingEventSink, EventKind, EventSink, FlowEvent, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::pipeline::{pipeline, series, Composed, DiscardPolicy, FlowBuilder, FlowConfig};
    pub use crate::recovery::{Recover, Recovery};
    pub use crate::tasks::{
        Args, AsyncFnTask, CallbackTask, Completion, FnTask, IdentityTask, NoOpTask, Task,
        TaskResult,
    };
}
