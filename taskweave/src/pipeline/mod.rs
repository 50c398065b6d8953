//! Flow composition and execution.
//!
//! This module provides:
//! - The unit compiler that turns descriptions into executable units
//! - Concurrent fan-out/fan-in of mapping and sequence groups
//! - The serial runner and its error-recovery dispatcher
//! - Flow configuration, the builder and the `series`/`pipeline` entry points

mod builder;
mod compile;
mod composed;
mod config;
mod dispatch;
mod fanout;
mod runner;


pub use builder::{pipeline, series, FlowBuilder};
pub use composed::Composed;
pub use config::{DiscardPolicy, FlowConfig};
