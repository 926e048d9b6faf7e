//! Application layer for magi-quorum
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{AggregatorParams, DispatchParams, MissingDecisionPolicy, WorkerParams};
pub use ports::{
    judge_directory::{DirectoryError, JudgeDirectory},
    llm_gateway::{GatewayError, Invocation, LlmGateway},
    transport::{
        ChannelSubscription, Delivery, TransportError, TransportFabric, TransportFabricExt,
    },
};
pub use use_cases::aggregate_results::{AggregateResultsUseCase, ResultDisposition, SweepReport};
pub use use_cases::dispatch_review::{DispatchError, DispatchOutcome, DispatchReviewUseCase};
pub use use_cases::execute_judgement::{DEFAULT_CONFIDENCE, ExecuteJudgementUseCase};
pub use use_cases::judge_pool::JudgeWorkerPool;
pub use use_cases::submit_review::{SubmitReviewError, SubmitReviewUseCase};
