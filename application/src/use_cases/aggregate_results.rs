//! Aggregate Results use case
//!
//! Joins the per-judge results of each request into one consensus:
//!
//! ```text
//! judgement.barrier ──► open barrier ◄── drain orphans
//!                            │
//! judgement.result  ──► admit (dedup by judge) ──► complete? ──► close once
//!                            │                                     │
//!        deadline sweep ─────┘ (timed_out = true)                  ▼
//!                                          session:results:{session_id}
//! ```
//!
//! Results can overtake their barrier announcement; they are held as orphans
//! for a short while and replayed when the barrier opens. Completed request
//! ids are remembered until the retention window has passed both their
//! completion and their deadline, so redelivered results are dropped instead
//! of resurrecting a barrier. Once a tombstone is pruned, its deadline joins
//! a high-water mark and any announcement at or below that mark is refused,
//! so a request yields at most one consensus no matter how late a
//! redelivery arrives.
//!
//! Locking: the orphan map lock is taken before the barrier map lock
//! whenever both are needed, and no lock is held across an `.await`.

use crate::config::AggregatorParams;
use crate::ports::transport::{TransportError, TransportFabric, TransportFabricExt};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use magi_domain::{
    Admission, BarrierAnnouncement, ConsensusResult, JoinBarrier, JudgementResult, QueueMessage,
    RequestId, SessionEvent, topics,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happened to an incoming result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDisposition {
    /// Recorded; the barrier is still waiting on other judges
    Recorded,
    /// Recorded and it completed the barrier; consensus was emitted
    Completed,
    /// This judge already reported for the request
    Duplicate,
    /// No barrier yet; held until it arrives or the orphan TTL passes
    Orphaned,
    /// The request already finished
    Stale,
    /// The judge is not in the request's roster
    UnknownJudge,
}

/// Counts from one deadline sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub timed_out: usize,
    pub orphans_dropped: usize,
    pub tombstones_pruned: usize,
}

struct Tombstone {
    deadline: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

struct OrphanBucket {
    first_seen: DateTime<Utc>,
    results: Vec<JudgementResult>,
}

/// Use case for joining judge results into consensus
pub struct AggregateResultsUseCase<T: TransportFabric + ?Sized + 'static> {
    transport: Arc<T>,
    params: AggregatorParams,
    barriers: RwLock<HashMap<RequestId, Arc<Mutex<JoinBarrier>>>>,
    orphans: Mutex<HashMap<RequestId, OrphanBucket>>,
    completed: Mutex<HashMap<RequestId, Tombstone>>,
    /// Latest deadline among pruned tombstones
    retired_through: Mutex<Option<DateTime<Utc>>>,
}

impl<T: TransportFabric + ?Sized + 'static> AggregateResultsUseCase<T> {
    pub fn new(transport: Arc<T>, params: AggregatorParams) -> Self {
        Self {
            transport,
            params,
            barriers: RwLock::new(HashMap::new()),
            orphans: Mutex::new(HashMap::new()),
            completed: Mutex::new(HashMap::new()),
            retired_through: Mutex::new(None),
        }
    }

    /// Number of barriers still waiting
    pub fn open_barriers(&self) -> usize {
        self.barriers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of requests with buffered orphan results
    pub fn orphaned_requests(&self) -> usize {
        self.orphans.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Open a barrier for an announcement.
    ///
    /// Repeated announcements, and announcements for requests that already
    /// finished, are ignored. Returns the consensus if buffered orphans
    /// completed the barrier on the spot.
    pub async fn on_barrier(&self, announcement: BarrierAnnouncement) -> Option<ConsensusResult> {
        self.on_barrier_at(announcement, Utc::now()).await
    }

    /// [`Self::on_barrier`] with an explicit clock reading.
    pub async fn on_barrier_at(
        &self,
        announcement: BarrierAnnouncement,
        now: DateTime<Utc>,
    ) -> Option<ConsensusResult> {
        let request_id = announcement.request_id;
        if self.is_completed(&request_id) {
            debug!("Ignoring barrier for finished request {}", request_id);
            return None;
        }
        if self.is_retired(&announcement, now) {
            warn!(
                "Ignoring barrier for {}: deadline {} is past the retention window",
                request_id, announcement.deadline
            );
            return None;
        }
        if announcement.expected_count() == 0 {
            warn!("Ignoring barrier with empty roster for {}", request_id);
            return None;
        }

        let (barrier, orphans) = {
            let mut orphans = self.orphans.lock().unwrap_or_else(|e| e.into_inner());
            let mut barriers = self.barriers.write().unwrap_or_else(|e| e.into_inner());
            if barriers.contains_key(&request_id) {
                debug!("Duplicate barrier announcement for {}", request_id);
                return None;
            }
            let barrier = Arc::new(Mutex::new(JoinBarrier::open(announcement, now)));
            barriers.insert(request_id, Arc::clone(&barrier));
            let buffered = orphans.remove(&request_id).map(|b| b.results);
            (barrier, buffered.unwrap_or_default())
        };

        info!(
            "Opened barrier for {} ({} orphaned results)",
            request_id,
            orphans.len()
        );

        let consensus = {
            let mut guard = barrier.lock().unwrap_or_else(|e| e.into_inner());
            let mut complete = false;
            for result in orphans {
                match guard.admit(result) {
                    Admission::Accepted { complete: true } => complete = true,
                    Admission::Accepted { complete: false } | Admission::Duplicate => {}
                    Admission::UnknownJudge => {
                        debug!("Dropping orphan from unknown judge for {}", request_id)
                    }
                    Admission::Closed => break,
                }
            }
            let closed = if complete { guard.close(now, false) } else { None };
            closed.map(|consensus| (consensus, guard.deadline()))
        };

        match consensus {
            Some((consensus, deadline)) => {
                self.finish(&consensus, deadline).await;
                Some(consensus)
            }
            None => None,
        }
    }

    /// Offer one judge result.
    pub async fn on_result(&self, result: JudgementResult) -> ResultDisposition {
        let request_id = result.request_id;

        let barrier = match self.barrier(&request_id) {
            Some(barrier) => barrier,
            None => {
                if self.is_completed(&request_id) {
                    debug!(
                        "Dropping late result from {} for finished {}",
                        result.judge_id, request_id
                    );
                    return ResultDisposition::Stale;
                }
                let mut orphans = self.orphans.lock().unwrap_or_else(|e| e.into_inner());
                // The barrier may have opened since the lookup above.
                match self.barrier(&request_id) {
                    Some(barrier) => barrier,
                    None => {
                        debug!(
                            "Buffering orphan result from {} for {}",
                            result.judge_id, request_id
                        );
                        orphans
                            .entry(request_id)
                            .or_insert_with(|| OrphanBucket {
                                first_seen: Utc::now(),
                                results: Vec::new(),
                            })
                            .results
                            .push(result);
                        return ResultDisposition::Orphaned;
                    }
                }
            }
        };

        let judge_id = result.judge_id.clone();
        let consensus = {
            let mut guard = barrier.lock().unwrap_or_else(|e| e.into_inner());
            match guard.admit(result) {
                Admission::Accepted { complete: true } => guard
                    .close(Utc::now(), false)
                    .map(|consensus| (consensus, guard.deadline())),
                Admission::Accepted { complete: false } => {
                    debug!(
                        "Recorded {} for {} ({}/{})",
                        judge_id,
                        request_id,
                        guard.received_count(),
                        guard.expected_count()
                    );
                    return ResultDisposition::Recorded;
                }
                Admission::Duplicate => {
                    debug!("Duplicate result from {} for {}", judge_id, request_id);
                    return ResultDisposition::Duplicate;
                }
                Admission::UnknownJudge => {
                    warn!("Result from unknown judge {} for {}", judge_id, request_id);
                    return ResultDisposition::UnknownJudge;
                }
                Admission::Closed => return ResultDisposition::Stale,
            }
        };

        match consensus {
            Some((consensus, deadline)) => {
                self.finish(&consensus, deadline).await;
                ResultDisposition::Completed
            }
            None => ResultDisposition::Stale,
        }
    }

    /// Close every barrier whose deadline has passed and expire old bookkeeping.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let candidates: Vec<Arc<Mutex<JoinBarrier>>> = self
            .barriers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();

        for barrier in candidates {
            let consensus = {
                let mut guard = barrier.lock().unwrap_or_else(|e| e.into_inner());
                if guard.is_expired(now) {
                    guard
                        .close(now, true)
                        .map(|consensus| (consensus, guard.deadline()))
                } else {
                    None
                }
            };
            if let Some((consensus, deadline)) = consensus {
                warn!(
                    "Barrier for {} timed out with {} missing judges",
                    consensus.request_id,
                    consensus.missing_judges.len()
                );
                self.finish(&consensus, deadline).await;
                report.timed_out += 1;
            }
        }

        let orphan_ttl = to_chrono(self.params.orphan_ttl);
        {
            let mut orphans = self.orphans.lock().unwrap_or_else(|e| e.into_inner());
            orphans.retain(|request_id, bucket| {
                let keep = now - bucket.first_seen < orphan_ttl;
                if !keep {
                    warn!(
                        "Dropping {} orphaned results for {}: barrier never arrived",
                        bucket.results.len(),
                        request_id
                    );
                    report.orphans_dropped += bucket.results.len();
                }
                keep
            });
        }

        {
            let mut completed = self.completed.lock().unwrap_or_else(|e| e.into_inner());
            let mut retired = self
                .retired_through
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            completed.retain(|_, tombstone| {
                let keep = now < tombstone.expires_at;
                if !keep {
                    *retired = Some(retired.map_or(tombstone.deadline, |mark| {
                        mark.max(tombstone.deadline)
                    }));
                    report.tombstones_pruned += 1;
                }
                keep
            });
        }

        report
    }

    /// Consume barrier and result queues until cancelled or the transport closes.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Aggregator started");
        loop {
            let delivery = tokio::select! {
                _ = cancel.cancelled() => break,
                delivery = self.transport.consume_from_queue(&[topics::BARRIER, topics::RESULT]) => delivery,
            };

            match delivery {
                Ok(delivery) => match QueueMessage::decode(&delivery.payload) {
                    Ok(QueueMessage::BarrierOpened(announcement)) => {
                        self.on_barrier(announcement).await;
                    }
                    Ok(QueueMessage::Result(result)) => {
                        self.on_result(result).await;
                    }
                    Ok(other) => warn!(
                        "Aggregator ignoring unexpected {} message on {}",
                        other.topic(),
                        delivery.topic
                    ),
                    Err(e) => warn!("Aggregator dropping malformed message: {}", e),
                },
                Err(TransportError::Closed) => break,
                Err(e) => {
                    warn!("Aggregator consume failed: {}", e);
                    tokio::task::yield_now().await;
                }
            }
        }
        info!("Aggregator stopped");
    }

    /// Run the periodic deadline sweep until cancelled.
    pub async fn run_sweeper(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.params.sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let report = self.sweep(Utc::now()).await;
                    if report != SweepReport::default() {
                        debug!("Sweep: {:?}", report);
                    }
                }
            }
        }
    }

    fn barrier(&self, request_id: &RequestId) -> Option<Arc<Mutex<JoinBarrier>>> {
        self.barriers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(request_id)
            .cloned()
    }

    fn is_completed(&self, request_id: &RequestId) -> bool {
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(request_id)
    }

    /// Whether an announcement is too old to ever open a barrier again.
    fn is_retired(&self, announcement: &BarrierAnnouncement, now: DateTime<Utc>) -> bool {
        let retention = to_chrono(self.params.completed_retention);
        if announcement
            .deadline
            .checked_add_signed(retention)
            .is_some_and(|expiry| expiry <= now)
        {
            return true;
        }
        self.retired_through
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some_and(|mark| announcement.deadline <= mark)
    }

    /// Retire a closed barrier and publish its consensus to the session.
    async fn finish(&self, consensus: &ConsensusResult, deadline: DateTime<Utc>) {
        {
            let retention = to_chrono(self.params.completed_retention);
            let mut completed = self.completed.lock().unwrap_or_else(|e| e.into_inner());
            completed.insert(
                consensus.request_id,
                Tombstone {
                    deadline,
                    expires_at: consensus
                        .computed_at
                        .max(deadline)
                        .checked_add_signed(retention)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC),
                },
            );
        }
        self.barriers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&consensus.request_id);

        info!(
            "Consensus for {}: {} [{}]{}",
            consensus.request_id,
            consensus.decision,
            consensus.vote_summary(),
            if consensus.timed_out { " (timed out)" } else { "" }
        );

        let event = SessionEvent::Consensus(consensus.clone());
        match self
            .transport
            .publish_event(&consensus.session_id, &event)
            .await
        {
            Ok(0) => debug!(
                "No live subscriber for {}; consensus dropped",
                consensus.session_id
            ),
            Ok(_) => {}
            Err(e) => warn!(
                "Failed to publish consensus for {}: {}",
                consensus.request_id, e
            ),
        }
    }
}

fn to_chrono(duration: std::time::Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or(ChronoDuration::MAX)
}
