//! Application-level configuration.
//!
//! - [`DispatchParams`]: barrier deadline handed out at dispatch
//! - [`AggregatorParams`]: sweep cadence and retention windows
//! - [`WorkerParams`]: pool size, invocation timeout, missing-decision policy

pub mod runtime_params;

pub use runtime_params::{AggregatorParams, DispatchParams, MissingDecisionPolicy, WorkerParams};
