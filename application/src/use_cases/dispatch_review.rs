//! Dispatch Review use case
//!
//! Fans a review request out to the active judge set. The barrier
//! announcement is always enqueued before the first sub-task so the
//! aggregator normally knows how many results to expect before any arrive.

use crate::config::DispatchParams;
use crate::ports::judge_directory::{DirectoryError, JudgeDirectory};
use crate::ports::transport::{TransportError, TransportFabric, TransportFabricExt};
use chrono::{Duration as ChronoDuration, Utc};
use magi_domain::{
    BarrierAnnouncement, JudgeConfig, JudgeSlot, JudgementResult, JudgementSubTask, QueueMessage,
    RequestId, ReviewErrorKind, ReviewRequest, SessionEvent, topics,
};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors that can occur while dispatching a request
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No judges available")]
    NoJudges,

    #[error("Judge directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Summary of a successful fan-out
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub request_id: RequestId,
    pub judge_count: usize,
}

/// Use case for fanning review requests out to judges
pub struct DispatchReviewUseCase<T, J>
where
    T: TransportFabric + ?Sized + 'static,
    J: JudgeDirectory + ?Sized + 'static,
{
    transport: Arc<T>,
    directory: Arc<J>,
    params: DispatchParams,
}

impl<T, J> DispatchReviewUseCase<T, J>
where
    T: TransportFabric + ?Sized + 'static,
    J: JudgeDirectory + ?Sized + 'static,
{
    pub fn new(transport: Arc<T>, directory: Arc<J>, params: DispatchParams) -> Self {
        Self {
            transport,
            directory,
            params,
        }
    }

    /// Dispatch one request.
    ///
    /// Failures before the barrier is announced are reported to the session
    /// as a `review_error`. Once the barrier exists the aggregator owns the
    /// terminal message, so later failures are only logged.
    pub async fn execute(&self, request: ReviewRequest) -> Result<DispatchOutcome, DispatchError> {
        let judges = match self.directory.active_judges().await {
            Ok(judges) => judges,
            Err(e) => {
                error!("Judge directory failed for {}: {}", request.request_id, e);
                self.report(&request, ReviewErrorKind::Transport, e.to_string())
                    .await;
                return Err(e.into());
            }
        };
        let judges = usable_judges(judges);

        if judges.is_empty() {
            warn!("No active judges for request {}", request.request_id);
            if let Err(e) = self
                .transport
                .publish_event(&request.session_id, &SessionEvent::no_judges(request.request_id))
                .await
            {
                warn!("Failed to report no-judges for {}: {}", request.request_id, e);
            }
            return Err(DispatchError::NoJudges);
        }

        info!(
            "Dispatching request {} to {} judges",
            request.request_id,
            judges.len()
        );

        let announcement = self.announcement(&request, &judges);
        let judge_count = announcement.expected_count();

        if let Err(e) = self
            .transport
            .enqueue(&QueueMessage::BarrierOpened(announcement))
            .await
        {
            error!("Failed to announce barrier for {}: {}", request.request_id, e);
            self.report(&request, ReviewErrorKind::Transport, e.to_string())
                .await;
            return Err(e.into());
        }

        for (index, judge) in judges.iter().enumerate() {
            let task = JudgementSubTask::for_judge(&request, judge);
            if let Err(e) = self.transport.enqueue(&QueueMessage::SubTask(task)).await {
                error!(
                    "Failed to enqueue sub-task for judge {} of {}: {}",
                    judge.judge_id, request.request_id, e
                );
                self.fail_remaining(&request, &judges[index..], &e).await;
                return Err(e.into());
            }
            debug!("Enqueued sub-task {} / {}", request.request_id, judge.judge_id);
        }

        Ok(DispatchOutcome {
            request_id: request.request_id,
            judge_count,
        })
    }

    /// Consume `review.request` until cancelled or the transport closes.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Dispatcher started");
        loop {
            let delivery = tokio::select! {
                _ = cancel.cancelled() => break,
                delivery = self.transport.consume_from_queue(&[topics::REVIEW_REQUEST]) => delivery,
            };

            match delivery {
                Ok(delivery) => match QueueMessage::decode(&delivery.payload) {
                    Ok(QueueMessage::ReviewRequest(request)) => {
                        if let Err(e) = self.execute(request).await {
                            debug!("Dispatch ended without fan-out: {}", e);
                        }
                    }
                    Ok(other) => warn!(
                        "Ignoring unexpected message on {}: {}",
                        delivery.topic,
                        other.topic()
                    ),
                    Err(e) => warn!("Dropping malformed review request: {}", e),
                },
                Err(TransportError::Closed) => break,
                Err(e) => {
                    warn!("Dispatcher consume failed: {}", e);
                    tokio::task::yield_now().await;
                }
            }
        }
        info!("Dispatcher stopped");
    }

    fn announcement(&self, request: &ReviewRequest, judges: &[JudgeConfig]) -> BarrierAnnouncement {
        let timeout = ChronoDuration::from_std(self.params.barrier_timeout)
            .unwrap_or_else(|_| ChronoDuration::seconds(30));
        let slots = judges
            .iter()
            .map(|judge| JudgeSlot::new(judge.judge_id.clone(), judge.weight))
            .collect();
        BarrierAnnouncement::new(
            request.request_id,
            request.session_id.clone(),
            slots,
            request.submitted_at,
            Utc::now() + timeout,
        )
    }

    /// Close out judges whose sub-task never reached the queue.
    ///
    /// Best effort: if the results cannot be published either, the barrier
    /// deadline still produces a partial consensus.
    async fn fail_remaining(
        &self,
        request: &ReviewRequest,
        judges: &[JudgeConfig],
        cause: &TransportError,
    ) {
        for judge in judges {
            let result = JudgementResult::failure(
                request.request_id,
                judge.judge_id.clone(),
                format!("dispatch failed: {}", cause),
            )
            .with_judge_name(judge.display_name());
            if let Err(e) = self.transport.enqueue(&QueueMessage::Result(result)).await {
                warn!(
                    "Could not close out judge {} of {}: {}",
                    judge.judge_id, request.request_id, e
                );
                return;
            }
        }
    }

    async fn report(&self, request: &ReviewRequest, kind: ReviewErrorKind, message: String) {
        let event = SessionEvent::ReviewError {
            request_id: Some(request.request_id),
            kind,
            message,
        };
        if let Err(e) = self
            .transport
            .publish_event(&request.session_id, &event)
            .await
        {
            warn!("Failed to report dispatch error for {}: {}", request.request_id, e);
        }
    }
}

/// Keep active judges with a valid weight, first occurrence of each id.
fn usable_judges(judges: Vec<JudgeConfig>) -> Vec<JudgeConfig> {
    let mut seen = std::collections::HashSet::new();
    judges
        .into_iter()
        .filter(|judge| judge.active)
        .filter(|judge| match judge.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping judge {}: {}", judge.judge_id, e);
                false
            }
        })
        .filter(|judge| seen.insert(judge.judge_id.clone()))
        .collect()
}
