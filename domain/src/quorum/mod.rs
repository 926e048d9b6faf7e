//! Quorum consensus domain
//!
//! This module contains the core concepts for judge voting and its reduction.
//!
//! # Core Concepts
//!
//! ## Judgement
//! Each judge renders one [`JudgementResult`] per request: a vote with a
//! confidence, or an error when the model capability failed.
//!
//! ## Join Barrier
//! The [`JoinBarrier`] collects results for one request, deduplicating by
//! judge id, and closes exactly once, either when every expected judge has
//! reported or when its deadline passes.
//!
//! ## Weighted Consensus
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  accept bucket = Σ weight(j) × confidence(j)  (j voted ✓)   │
//! │  reject bucket = Σ weight(j) × confidence(j)  (j voted ✗)   │
//! │                                                             │
//! │  accept > reject  →  Accept                                 │
//! │  otherwise        →  Reject   (ties are conservative)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod barrier;
pub mod consensus;
pub mod parsing;
pub mod vote;

// Re-export main types
pub use barrier::{Admission, BarrierAnnouncement, JoinBarrier, JudgeSlot};
pub use consensus::{ConsensusResult, VoteDistribution};
pub use parsing::{ParsedVerdict, parse_confidence, parse_decision_literal, parse_verdict};
pub use vote::{Decision, JudgementResult};
