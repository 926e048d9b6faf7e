//! Review domain
//!
//! A [`ReviewRequest`] enters through the Gateway, is fanned out by the
//! Dispatcher into one [`JudgementSubTask`] per active [`JudgeConfig`], and is
//! joined again by the Aggregator.

pub mod entities;
pub mod judge;

pub use entities::{JudgementSubTask, RequestId, ReviewRequest};
pub use judge::{JudgeConfig, ModelParams};
