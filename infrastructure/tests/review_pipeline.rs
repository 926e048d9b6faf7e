//! End-to-end review pipeline over the in-memory transport.
//!
//! Dispatcher, judge worker pool and aggregator run as background tasks;
//! a scripted gateway stands in for the model.

use async_trait::async_trait;
use magi_application::{
    AggregateResultsUseCase, AggregatorParams, ChannelSubscription, DispatchParams,
    DispatchReviewUseCase, ExecuteJudgementUseCase, GatewayError, Invocation, JudgeWorkerPool,
    LlmGateway, SubmitReviewUseCase, TransportFabric, TransportFabricExt, WorkerParams,
};
use magi_domain::{
    BarrierAnnouncement, ConsensusResult, Decision, JudgeConfig, JudgeSlot, JudgementResult,
    QueueMessage, RequestId, ReviewErrorKind, SessionEvent, SessionId,
};
use magi_infrastructure::{InMemoryTransport, StaticJudgeDirectory};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Clone)]
enum Behaviour {
    Answer(&'static str),
    Fail,
    Hang,
}

/// Answers by persona: each judge's system prompt is its id.
struct ScriptedGateway {
    script: HashMap<String, Behaviour>,
}

impl ScriptedGateway {
    fn new(script: &[(&str, Behaviour)]) -> Self {
        Self {
            script: script
                .iter()
                .map(|(id, b)| (id.to_string(), b.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn invoke(&self, invocation: Invocation<'_>) -> Result<String, GatewayError> {
        match self.script.get(invocation.system_prompt) {
            Some(Behaviour::Answer(text)) => Ok(text.to_string()),
            Some(Behaviour::Fail) => Err(GatewayError::RequestFailed("model offline".into())),
            Some(Behaviour::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(GatewayError::Timeout)
            }
            None => Err(GatewayError::ModelNotAvailable(
                invocation.system_prompt.to_string(),
            )),
        }
    }
}

fn judge(id: &str, weight: f64) -> JudgeConfig {
    JudgeConfig::new(id, weight).with_system_prompt(id)
}

struct Pipeline {
    transport: Arc<InMemoryTransport>,
    submit: SubmitReviewUseCase<InMemoryTransport>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    fn start(judges: Vec<JudgeConfig>, gateway: ScriptedGateway, barrier_timeout: Duration) -> Self {
        let transport = Arc::new(InMemoryTransport::new());
        let cancel = CancellationToken::new();

        let dispatcher = Arc::new(DispatchReviewUseCase::new(
            Arc::clone(&transport),
            Arc::new(StaticJudgeDirectory::new(judges)),
            DispatchParams::default().with_barrier_timeout(barrier_timeout),
        ));
        let aggregator = Arc::new(AggregateResultsUseCase::new(
            Arc::clone(&transport),
            AggregatorParams::default().with_sweep_interval(Duration::from_millis(50)),
        ));
        let pool = Arc::new(JudgeWorkerPool::new(
            Arc::clone(&transport),
            ExecuteJudgementUseCase::new(
                Arc::new(gateway),
                WorkerParams::default()
                    .with_pool_size(3)
                    .with_invoke_timeout(Duration::from_secs(20)),
            ),
        ));

        let mut tasks = Vec::new();
        {
            let (dispatcher, cancel) = (Arc::clone(&dispatcher), cancel.clone());
            tasks.push(tokio::spawn(async move { dispatcher.run(cancel).await }));
        }
        {
            let (aggregator, cancel) = (Arc::clone(&aggregator), cancel.clone());
            tasks.push(tokio::spawn(async move { aggregator.run(cancel).await }));
        }
        {
            let (aggregator, cancel) = (Arc::clone(&aggregator), cancel.clone());
            tasks.push(tokio::spawn(async move { aggregator.run_sweeper(cancel).await }));
        }
        {
            let (pool, cancel) = (Arc::clone(&pool), cancel.clone());
            tasks.push(tokio::spawn(async move { pool.run(cancel).await }));
        }

        Self {
            submit: SubmitReviewUseCase::new(Arc::clone(&transport)),
            transport,
            cancel,
            tasks,
        }
    }

    async fn subscribe(&self, session: &SessionId) -> ChannelSubscription {
        self.transport
            .subscribe_to_channel(&session.result_channel())
            .await
            .unwrap()
    }

    async fn submit(&self, session: &SessionId, payload: &str) -> RequestId {
        self.submit
            .execute(session, payload.to_string())
            .await
            .unwrap()
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        self.transport.close();
        for task in self.tasks {
            let _ = tokio::time::timeout(WAIT, task).await;
        }
    }
}

async fn next_event(subscription: &mut ChannelSubscription) -> SessionEvent {
    let raw = tokio::time::timeout(WAIT, subscription.recv())
        .await
        .expect("terminal message in time")
        .expect("subscription open");
    SessionEvent::decode(&raw).unwrap()
}

async fn next_consensus(subscription: &mut ChannelSubscription) -> ConsensusResult {
    match next_event(subscription).await {
        SessionEvent::Consensus(consensus) => consensus,
        other => panic!("expected consensus, got {:?}", other),
    }
}

async fn assert_quiet(subscription: &mut ChannelSubscription) {
    let extra = tokio::time::timeout(Duration::from_millis(300), subscription.recv()).await;
    assert!(extra.is_err(), "unexpected extra message: {:?}", extra);
}

const ACCEPT: &str = "<decision>POSITIVE</decision><confidence>1.0</confidence>Fine.";
const REJECT: &str = "<decision>NEGATIVE</decision>Needs work.";

#[tokio::test]
async fn test_weighted_majority_reaches_session_once() {
    let pipeline = Pipeline::start(
        vec![judge("melchior", 3.0), judge("balthasar", 1.0), judge("casper", 1.0)],
        ScriptedGateway::new(&[
            ("melchior", Behaviour::Answer(ACCEPT)),
            ("balthasar", Behaviour::Answer(REJECT)),
            ("casper", Behaviour::Answer(REJECT)),
        ]),
        Duration::from_secs(10),
    );
    let session = SessionId::new("session-app-1-aaa");
    let mut subscription = pipeline.subscribe(&session).await;

    let request_id = pipeline.submit(&session, "fn main() {}").await;
    let consensus = next_consensus(&mut subscription).await;

    assert_eq!(consensus.request_id, request_id);
    assert_eq!(consensus.session_id, session);
    assert_eq!(consensus.decision, Decision::Accept);
    assert!((consensus.distribution.accept - 3.0).abs() < 1e-9);
    assert!((consensus.distribution.reject - 2.0).abs() < 1e-9);
    assert_eq!(consensus.per_judge.len(), 3);
    assert!(!consensus.timed_out);

    assert_quiet(&mut subscription).await;
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_tie_rejects() {
    let pipeline = Pipeline::start(
        vec![judge("melchior", 1.0), judge("balthasar", 1.0)],
        ScriptedGateway::new(&[
            ("melchior", Behaviour::Answer(ACCEPT)),
            ("balthasar", Behaviour::Answer(REJECT)),
        ]),
        Duration::from_secs(10),
    );
    let session = SessionId::new("session-app-1-tie");
    let mut subscription = pipeline.subscribe(&session).await;

    pipeline.submit(&session, "payload").await;
    assert_eq!(next_consensus(&mut subscription).await.decision, Decision::Reject);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_no_judges_yields_review_error() {
    let pipeline = Pipeline::start(
        vec![judge("melchior", 1.0).inactive()],
        ScriptedGateway::new(&[]),
        Duration::from_secs(10),
    );
    let session = SessionId::new("session-app-1-none");
    let mut subscription = pipeline.subscribe(&session).await;

    let request_id = pipeline.submit(&session, "payload").await;
    match next_event(&mut subscription).await {
        SessionEvent::ReviewError {
            request_id: Some(id),
            kind,
            ..
        } => {
            assert_eq!(id, request_id);
            assert_eq!(kind, ReviewErrorKind::NoJudges);
        }
        other => panic!("expected review error, got {:?}", other),
    }
    assert_quiet(&mut subscription).await;
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_failing_judge_still_completes() {
    let pipeline = Pipeline::start(
        vec![judge("melchior", 1.0), judge("balthasar", 1.0), judge("casper", 1.0)],
        ScriptedGateway::new(&[
            ("melchior", Behaviour::Answer(ACCEPT)),
            ("balthasar", Behaviour::Fail),
            ("casper", Behaviour::Answer("no verdict here")),
        ]),
        Duration::from_secs(10),
    );
    let session = SessionId::new("session-app-1-err");
    let mut subscription = pipeline.subscribe(&session).await;

    pipeline.submit(&session, "payload").await;
    let consensus = next_consensus(&mut subscription).await;

    assert!(!consensus.timed_out);
    assert_eq!(consensus.error_count(), 2);
    assert_eq!(consensus.decision, Decision::Accept);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_hung_judge_yields_partial_consensus() {
    let pipeline = Pipeline::start(
        vec![judge("melchior", 1.0), judge("balthasar", 1.0), judge("casper", 1.0)],
        ScriptedGateway::new(&[
            ("melchior", Behaviour::Answer(REJECT)),
            ("balthasar", Behaviour::Answer(REJECT)),
            ("casper", Behaviour::Hang),
        ]),
        Duration::from_millis(500),
    );
    let session = SessionId::new("session-app-1-slow");
    let mut subscription = pipeline.subscribe(&session).await;

    pipeline.submit(&session, "payload").await;
    let consensus = next_consensus(&mut subscription).await;

    assert!(consensus.timed_out);
    assert_eq!(consensus.decision, Decision::Reject);
    assert_eq!(consensus.missing_judges, vec!["casper".to_string()]);
    assert_eq!(consensus.per_judge.len(), 2);

    assert_quiet(&mut subscription).await;
    pipeline.shutdown().await;
}

#[tokio::test]
async fn test_sessions_only_see_their_own_results() {
    let pipeline = Pipeline::start(
        vec![judge("melchior", 1.0)],
        ScriptedGateway::new(&[("melchior", Behaviour::Answer(ACCEPT))]),
        Duration::from_secs(10),
    );
    let first = SessionId::new("session-a-1-one");
    let second = SessionId::new("session-b-1-two");
    let mut first_sub = pipeline.subscribe(&first).await;
    let mut second_sub = pipeline.subscribe(&second).await;

    let first_request = pipeline.submit(&first, "one").await;
    let second_request = pipeline.submit(&second, "two").await;

    assert_eq!(next_consensus(&mut first_sub).await.request_id, first_request);
    assert_eq!(next_consensus(&mut second_sub).await.request_id, second_request);
    assert_quiet(&mut first_sub).await;
    assert_quiet(&mut second_sub).await;
    pipeline.shutdown().await;
}

/// Drives the aggregator directly through the queues: results overtake
/// their barrier and one of them is delivered twice.
#[tokio::test]
async fn test_redelivered_and_early_results_count_once() {
    let pipeline = Pipeline::start(vec![], ScriptedGateway::new(&[]), Duration::from_secs(10));
    let session = SessionId::new("session-app-1-dup");
    let mut subscription = pipeline.subscribe(&session).await;

    let request_id = RequestId::new();
    let vote = |judge: &str, decision| {
        QueueMessage::Result(JudgementResult::vote(request_id, judge, decision, 1.0, 1.0))
    };

    pipeline
        .transport
        .enqueue(&vote("melchior", Decision::Accept))
        .await
        .unwrap();
    pipeline
        .transport
        .enqueue(&vote("melchior", Decision::Accept))
        .await
        .unwrap();

    let now = chrono::Utc::now();
    let announcement = BarrierAnnouncement::new(
        request_id,
        session.clone(),
        vec![JudgeSlot::new("melchior", 1.0), JudgeSlot::new("balthasar", 1.0)],
        now,
        now + chrono::Duration::seconds(10),
    );
    pipeline
        .transport
        .enqueue(&QueueMessage::BarrierOpened(announcement))
        .await
        .unwrap();
    pipeline
        .transport
        .enqueue(&vote("balthasar", Decision::Reject))
        .await
        .unwrap();

    let consensus = next_consensus(&mut subscription).await;
    assert_eq!(consensus.request_id, request_id);
    assert_eq!(consensus.per_judge.len(), 2);
    assert!((consensus.distribution.accept - 1.0).abs() < 1e-9);
    assert!((consensus.distribution.reject - 1.0).abs() < 1e-9);

    // a late redelivery after completion is dropped
    pipeline
        .transport
        .enqueue(&vote("balthasar", Decision::Reject))
        .await
        .unwrap();
    assert_quiet(&mut subscription).await;
    pipeline.shutdown().await;
}
