//! Use cases for the review pipeline

pub mod aggregate_results;
pub mod dispatch_review;
pub mod execute_judgement;
pub mod judge_pool;
pub mod submit_review;
