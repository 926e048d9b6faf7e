//! Domain layer for magi-quorum
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Review
//!
//! A client submits a [`ReviewRequest`]; it is fanned out as one
//! [`JudgementSubTask`] per active [`JudgeConfig`].
//!
//! ## Quorum
//!
//! - **Join Barrier**: collects per-judge results for one request, idempotently
//! - **Weighted Consensus**: `weight × confidence` per bucket, ties reject
//!
//! ## Messaging
//!
//! Components never hold references to each other. They exchange
//! [`QueueMessage`]s over work queues and publish [`SessionEvent`]s to
//! per-session channels.

pub mod core;
pub mod messaging;
pub mod prompt;
pub mod quorum;
pub mod review;
pub mod session;

// Re-export commonly used types
pub use core::error::DomainError;
pub use messaging::{QueueMessage, ReviewErrorKind, SessionEvent, topics};
pub use prompt::PromptTemplate;
pub use quorum::{
    Admission, BarrierAnnouncement, ConsensusResult, Decision, JoinBarrier, JudgeSlot,
    JudgementResult, ParsedVerdict, VoteDistribution, parse_verdict,
};
pub use review::{JudgeConfig, JudgementSubTask, ModelParams, RequestId, ReviewRequest};
pub use session::{Session, SessionId};
