//! Execute Judgement use case
//!
//! Turns one [`JudgementSubTask`] into exactly one [`JudgementResult`]. The
//! worker is stateless between tasks: everything it needs travels in the
//! sub-task itself.

use crate::config::{MissingDecisionPolicy, WorkerParams};
use crate::ports::llm_gateway::{GatewayError, Invocation, LlmGateway};
use magi_domain::{Decision, JudgementResult, JudgementSubTask, PromptTemplate, parse_verdict};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Confidence used when the model gives a decision but no confidence tag.
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// Use case for rendering one judge's vote
pub struct ExecuteJudgementUseCase<G: LlmGateway + ?Sized + 'static> {
    gateway: Arc<G>,
    params: WorkerParams,
}

impl<G: LlmGateway + ?Sized + 'static> ExecuteJudgementUseCase<G> {
    pub fn new(gateway: Arc<G>, params: WorkerParams) -> Self {
        Self { gateway, params }
    }

    pub fn params(&self) -> &WorkerParams {
        &self.params
    }

    /// Invoke the model for `task` and interpret its answer.
    ///
    /// Never fails: capability errors, timeouts and unreadable output all
    /// become error results so the barrier still hears from this judge.
    pub async fn execute(&self, task: &JudgementSubTask) -> JudgementResult {
        let system_prompt = PromptTemplate::system(&task.system_prompt);
        let user_prompt = PromptTemplate::render_user(&task.prompt_template, &task.payload);
        let invocation = Invocation {
            system_prompt,
            user_prompt: &user_prompt,
            params: &task.params,
        };

        debug!("Judge {} evaluating {}", task.judge_id, task.request_id);

        let raw = match tokio::time::timeout(
            self.params.invoke_timeout,
            self.gateway.invoke(invocation),
        )
        .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!("Judge {} failed on {}: {}", task.judge_id, task.request_id, e);
                return self.failure(task, e.to_string());
            }
            Err(_) => {
                warn!(
                    "Judge {} timed out on {} after {:?}",
                    task.judge_id, task.request_id, self.params.invoke_timeout
                );
                return self.failure(task, GatewayError::Timeout.to_string());
            }
        };

        match parse_verdict(&raw) {
            Some(verdict) => {
                info!(
                    "Judge {} voted {} on {}",
                    task.judge_id, verdict.decision, task.request_id
                );
                JudgementResult::vote(
                    task.request_id,
                    task.judge_id.clone(),
                    verdict.decision,
                    verdict.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                    task.weight,
                )
                .with_judge_name(task.judge_name.clone())
                .with_reasoning(verdict.reasoning)
            }
            None => match self.params.missing_decision {
                MissingDecisionPolicy::Error => {
                    warn!(
                        "Judge {} returned no readable decision for {}",
                        task.judge_id, task.request_id
                    );
                    self.failure(task, "unparseable model output".to_string())
                        .with_reasoning(raw.trim())
                }
                MissingDecisionPolicy::Reject => {
                    debug!(
                        "Judge {} gave no decision for {}, counting as reject",
                        task.judge_id, task.request_id
                    );
                    JudgementResult::vote(
                        task.request_id,
                        task.judge_id.clone(),
                        Decision::Reject,
                        DEFAULT_CONFIDENCE,
                        task.weight,
                    )
                    .with_judge_name(task.judge_name.clone())
                    .with_reasoning(raw.trim())
                }
            },
        }
    }

    fn failure(&self, task: &JudgementSubTask, error: String) -> JudgementResult {
        JudgementResult::failure(task.request_id, task.judge_id.clone(), error)
            .with_judge_name(task.judge_name.clone())
    }
}
