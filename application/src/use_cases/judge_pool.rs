//! Judge worker pool
//!
//! A fixed number of identical workers compete for `judgement.subtask`
//! messages. Each delivery yields exactly one message on `judgement.result`.

use crate::ports::llm_gateway::LlmGateway;
use crate::ports::transport::{TransportError, TransportFabric, TransportFabricExt};
use crate::use_cases::execute_judgement::ExecuteJudgementUseCase;
use magi_domain::{QueueMessage, topics};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pool of judge workers sharing one transport and one gateway
pub struct JudgeWorkerPool<T, G>
where
    T: TransportFabric + ?Sized + 'static,
    G: LlmGateway + ?Sized + 'static,
{
    transport: Arc<T>,
    judgement: Arc<ExecuteJudgementUseCase<G>>,
}

impl<T, G> JudgeWorkerPool<T, G>
where
    T: TransportFabric + ?Sized + 'static,
    G: LlmGateway + ?Sized + 'static,
{
    pub fn new(transport: Arc<T>, judgement: ExecuteJudgementUseCase<G>) -> Self {
        Self {
            transport,
            judgement: Arc::new(judgement),
        }
    }

    /// Run `pool_size` workers until cancelled or the transport closes.
    pub async fn run(&self, cancel: CancellationToken) {
        let size = self.judgement.params().pool_size.max(1);
        info!("Starting {} judge workers", size);

        let mut join_set = JoinSet::new();
        for index in 0..size {
            let transport = Arc::clone(&self.transport);
            let judgement = Arc::clone(&self.judgement);
            let cancel = cancel.clone();
            join_set.spawn(async move {
                worker_loop(index, transport, judgement, cancel).await;
            });
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                warn!("Judge worker task failed: {}", e);
            }
        }
        info!("Judge workers stopped");
    }
}

async fn worker_loop<T, G>(
    index: usize,
    transport: Arc<T>,
    judgement: Arc<ExecuteJudgementUseCase<G>>,
    cancel: CancellationToken,
) where
    T: TransportFabric + ?Sized + 'static,
    G: LlmGateway + ?Sized + 'static,
{
    debug!("Worker {} ready", index);
    loop {
        let delivery = tokio::select! {
            _ = cancel.cancelled() => break,
            delivery = transport.consume_from_queue(&[topics::SUBTASK]) => delivery,
        };

        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(TransportError::Closed) => break,
            Err(e) => {
                warn!("Worker {} consume failed: {}", index, e);
                tokio::task::yield_now().await;
                continue;
            }
        };

        let task = match QueueMessage::decode(&delivery.payload) {
            Ok(QueueMessage::SubTask(task)) => task,
            Ok(other) => {
                warn!(
                    "Worker {} ignoring unexpected {} message",
                    index,
                    other.topic()
                );
                continue;
            }
            Err(e) => {
                warn!("Worker {} dropping malformed sub-task: {}", index, e);
                continue;
            }
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = judgement.execute(&task) => result,
        };

        if let Err(e) = transport.enqueue(&QueueMessage::Result(result)).await {
            warn!(
                "Worker {} could not publish result for {} / {}: {}",
                index, task.request_id, task.judge_id, e
            );
        }
    }
    debug!("Worker {} exiting", index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerParams;
    use crate::ports::llm_gateway::{GatewayError, Invocation};
    use crate::ports::transport::{ChannelSubscription, Delivery};
    use async_trait::async_trait;
    use chrono::Utc;
    use magi_domain::{
        Decision, JudgeConfig, JudgementResult, JudgementSubTask, ReviewRequest, SessionId,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Pre-loaded sub-task queue; reports `Closed` once drained.
    struct DrainingTransport {
        pending: Mutex<VecDeque<String>>,
        results: Mutex<Vec<JudgementResult>>,
    }

    #[async_trait]
    impl TransportFabric for DrainingTransport {
        async fn publish_to_queue(&self, topic: &str, message: String) -> Result<(), TransportError> {
            assert_eq!(topic, topics::RESULT);
            match QueueMessage::decode(&message).unwrap() {
                QueueMessage::Result(result) => self.results.lock().unwrap().push(result),
                other => panic!("unexpected {:?}", other),
            }
            Ok(())
        }

        async fn consume_from_queue(&self, topics: &[&str]) -> Result<Delivery, TransportError> {
            assert_eq!(topics, &[magi_domain::topics::SUBTASK]);
            let next = self.pending.lock().unwrap().pop_front();
            next.map(|payload| Delivery {
                topic: magi_domain::topics::SUBTASK.to_string(),
                payload,
            })
            .ok_or(TransportError::Closed)
        }

        async fn publish_to_channel(&self, _: &str, _: String) -> Result<usize, TransportError> {
            Ok(0)
        }

        async fn subscribe_to_channel(&self, _: &str) -> Result<ChannelSubscription, TransportError> {
            Err(TransportError::Closed)
        }
    }

    struct ApprovingGateway;

    #[async_trait]
    impl LlmGateway for ApprovingGateway {
        async fn invoke(&self, _invocation: Invocation<'_>) -> Result<String, GatewayError> {
            Ok("<decision>POSITIVE</decision>".to_string())
        }
    }

    #[tokio::test]
    async fn test_every_subtask_yields_one_result() {
        let request = ReviewRequest::new(SessionId::new("s"), "payload", Utc::now()).unwrap();
        let mut pending: VecDeque<String> = ["melchior", "balthasar", "casper"]
            .iter()
            .map(|id| {
                let task = JudgementSubTask::for_judge(&request, &JudgeConfig::new(*id, 1.0));
                QueueMessage::SubTask(task).encode().unwrap()
            })
            .collect();
        pending.push_back("not json".to_string());

        let transport = Arc::new(DrainingTransport {
            pending: Mutex::new(pending),
            results: Mutex::new(Vec::new()),
        });
        let judgement = ExecuteJudgementUseCase::new(
            Arc::new(ApprovingGateway),
            WorkerParams::default().with_pool_size(2),
        );
        let pool = JudgeWorkerPool::new(transport.clone(), judgement);

        pool.run(CancellationToken::new()).await;

        let results = transport.results.lock().unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.decision == Some(Decision::Accept)));
        assert!(results.iter().all(|r| r.request_id == request.request_id));
    }
}
