//! Batch loading manager implementation.
//!
//! The manager owns an ordered queue of presentations and drives the
//! synchronizer one item at a time, asking its retry policy what to do with
//! each failure and reporting every lifecycle change to the observer.
//!
//! # Architecture
//!
//! - **Manager**: Owns queue, policy, leases and the runner lifecycle
//! - **Runner task**: Drains the queue for one batch, then exits
//! - **Bridge task**: Subscribes to the item's watch channel and forwards
//!   throttled progress while the item's lease is active
//!
//! # Concurrency Model
//!
//! - All state sits behind a single `Mutex`; observer events are emitted
//!   while it is held, so they reach the observer in lifecycle order
//! - At most one runner per batch; a runner whose epoch is no longer
//!   current stops at its next step
//! - Lease tokens prevent stale finalize commits after a cancel

mod run_state;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;

use smartlib_core::{
    BatchEvent, BatchObserverPort, BatchSnapshot, BatchSummary, ItemOutcome, Presentation,
    PresentationId, PresentationSynchronizerPort, RetryPolicy, SettingsError, SyncError,
    SyncProgress, SyncSettings, validate_settings,
};

use crate::progress::ProgressThrottle;
use crate::queue::{BatchQueue, SlotId};
use crate::retry::BoundedRetry;

use run_state::BatchRunState;

/// Lease ID for the item currently synchronizing.
///
/// Used to ignore completions that arrive after the item was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LeaseId(u64);

/// State for the item currently synchronizing.
struct ActiveJob {
    lease: LeaseId,
    slot: SlotId,
    id: PresentationId,
    cancel: CancellationToken,
}

/// A dequeued item handed to the runner.
struct NextJob {
    lease: LeaseId,
    slot: SlotId,
    presentation: Presentation,
    cancel: CancellationToken,
}

/// Configuration for the batch loading manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchManagerConfig {
    /// Minimum gap between forwarded progress events.
    pub progress_interval: Duration,
}

impl BatchManagerConfig {
    pub const fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            progress_interval: settings.effective_progress_interval(),
        }
    }
}

impl Default for BatchManagerConfig {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::with_defaults())
    }
}

/// Mutable manager state. Guarded by `BatchLoadingManager::state`.
struct BatchState {
    queue: BatchQueue,
    policy: Box<dyn RetryPolicy>,
    /// Set by `cancel_loading`, cleared by `start_loading`.
    canceled: bool,
    /// Bumped on every runner spawn.
    epoch: u64,
    /// Epoch of the runner draining the queue, if any.
    runner: Option<u64>,
    active: Option<ActiveJob>,
    run: Option<BatchRunState>,
    /// `Done` has been emitted and no batch has been prepared since.
    done_reported: bool,
}

/// Dependencies for building a batch loading manager from settings.
pub struct BatchLoadingManagerDeps {
    pub synchronizer: Arc<dyn PresentationSynchronizerPort>,
    pub observer: Arc<dyn BatchObserverPort>,
    pub settings: SyncSettings,
}

/// Build a manager using [`BoundedRetry`] with the configured fail count.
///
/// Fails if the settings are out of range.
pub fn build_batch_manager(
    deps: BatchLoadingManagerDeps,
) -> Result<Arc<BatchLoadingManager>, SettingsError> {
    validate_settings(&deps.settings)?;

    let policy = BoundedRetry::new(deps.settings.effective_max_fail_count());
    Ok(Arc::new(BatchLoadingManager::new(
        deps.synchronizer,
        deps.observer,
        Box::new(policy),
        BatchManagerConfig::from_settings(&deps.settings),
    )))
}

/// Sequential, cancelable, retrying loader for a batch of presentations.
///
/// Methods that start work take `self: &Arc<Self>` because the runner task
/// keeps the manager alive until the batch ends.
pub struct BatchLoadingManager {
    synchronizer: Arc<dyn PresentationSynchronizerPort>,
    observer: Arc<dyn BatchObserverPort>,
    config: BatchManagerConfig,
    state: Mutex<BatchState>,
    lease_counter: AtomicU64,
}

impl BatchLoadingManager {
    pub fn new(
        synchronizer: Arc<dyn PresentationSynchronizerPort>,
        observer: Arc<dyn BatchObserverPort>,
        policy: Box<dyn RetryPolicy>,
        config: BatchManagerConfig,
    ) -> Self {
        Self {
            synchronizer,
            observer,
            config,
            state: Mutex::new(BatchState {
                queue: BatchQueue::new(),
                policy,
                canceled: false,
                epoch: 0,
                runner: None,
                active: None,
                run: None,
                done_reported: true,
            }),
            lease_counter: AtomicU64::new(0),
        }
    }

    /// Replace everything not yet started with `presentations`.
    ///
    /// Emits `Prepare` with the de-duplicated count. The item currently
    /// synchronizing (if any) is unaffected. Returns the new pending count.
    pub async fn add_presentations(&self, presentations: Vec<Presentation>) -> usize {
        let mut state = self.state.lock().await;
        let total = state.queue.replace(presentations);
        state.done_reported = false;

        tracing::debug!(target: "smartlib.download", total, "Batch queue replaced");
        self.observer.emit(BatchEvent::Prepare { total });
        total
    }

    /// Clear the cancel flag and start draining the queue.
    ///
    /// A call while a runner is already draining is a no-op. An empty queue
    /// finishes the batch straight away with `Done { canceled: false }`.
    pub async fn start_loading(self: &Arc<Self>) {
        let epoch = {
            let mut state = self.state.lock().await;
            state.canceled = false;

            if state.runner.is_some() {
                tracing::debug!(target: "smartlib.download", "Batch already loading");
                return;
            }

            state.epoch += 1;
            let epoch = state.epoch;
            state.runner = Some(epoch);
            state.done_reported = false;
            let batch_id = state.run.get_or_insert_with(BatchRunState::new).batch_id();

            tracing::info!(
                target: "smartlib.download",
                batch_id = %batch_id,
                pending = state.queue.pending_len(),
                "Batch loading started"
            );
            epoch
        };

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.run_loop(epoch).await;
        });
    }

    /// Cancel the batch.
    ///
    /// The in-flight transfer (if any) is asked to stop, the queue is
    /// cleared and `Done { canceled: true }` is emitted before this returns.
    /// The manager does not wait for the transfer to acknowledge; its late
    /// result is ignored. When no batch is pending or running only the
    /// cancel flag is set; the previous batch already reported its `Done`.
    pub async fn cancel_loading(&self) {
        let mut state = self.state.lock().await;
        state.canceled = true;

        if state.done_reported
            && state.runner.is_none()
            && state.active.is_none()
            && state.queue.is_empty()
        {
            tracing::debug!(target: "smartlib.download", "Nothing to cancel");
            return;
        }

        let in_flight = state.active.take().map(|job| {
            job.cancel.cancel();
            self.synchronizer.cancel(&job.id);
            job.id
        });

        tracing::info!(
            target: "smartlib.download",
            in_flight = ?in_flight.map(PresentationId::get),
            pending = state.queue.pending_len(),
            "Batch loading cancelled"
        );

        self.finish_batch(&mut state, true, in_flight);
    }

    /// Point-in-time view of the queue.
    pub async fn snapshot(&self) -> BatchSnapshot {
        let state = self.state.lock().await;
        BatchSnapshot {
            current: state.active.as_ref().map(|job| job.id),
            pending: state.queue.pending_ids(),
            running: state.runner.is_some(),
            canceled: state.canceled,
        }
    }

    /// Drain the queue for one batch.
    async fn run_loop(self: Arc<Self>, epoch: u64) {
        while let Some(job) = self.next_job(epoch).await {
            let result = self.execute(&job).await;
            if !self.finalize_job(&job, result).await {
                break;
            }
        }
        tracing::debug!(target: "smartlib.download", epoch, "Batch runner exited");
    }

    /// Get the next job, or finish the batch if the queue is drained.
    ///
    /// Returns `None` when this runner should stop.
    async fn next_job(&self, epoch: u64) -> Option<NextJob> {
        let mut state = self.state.lock().await;

        if state.canceled || state.runner != Some(epoch) {
            return None;
        }

        let Some((slot, item)) = state.queue.dequeue() else {
            self.finish_batch(&mut state, false, None);
            return None;
        };

        let lease = LeaseId(self.lease_counter.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        let id = item.id();
        let name = item.presentation.display_name();

        state.active = Some(ActiveJob {
            lease,
            slot,
            id,
            cancel: cancel.clone(),
        });
        if let Some(run) = state.run.as_mut() {
            run.record_start(id, &name);
        }

        tracing::debug!(
            target: "smartlib.download",
            id = %id,
            attempt = item.attempts,
            remaining = state.queue.pending_len(),
            "Presentation sync started"
        );
        self.observer.emit(BatchEvent::Started {
            id,
            name,
            attempt: item.attempts,
        });

        Some(NextJob {
            lease,
            slot,
            presentation: item.presentation,
            cancel,
        })
    }

    /// Run the synchronizer for one job with cancellation support.
    async fn execute(self: &Arc<Self>, job: &NextJob) -> Result<(), SyncError> {
        let (progress_tx, progress_rx) = watch::channel(SyncProgress::default());
        let bridge = self.spawn_progress_bridge(
            job.lease,
            job.presentation.id,
            progress_rx,
            job.cancel.clone(),
        );

        // The synchronize future owns the sender; dropping it lets the
        // bridge flush its last update and exit.
        let result = tokio::select! {
            biased;

            () = job.cancel.cancelled() => Err(SyncError::Cancelled),

            result = self.synchronizer.synchronize(&job.presentation, progress_tx) => result,
        };

        if let Err(e) = bridge.await {
            tracing::debug!(target: "smartlib.download", error = %e, "Progress bridge aborted");
        }

        result
    }

    /// Apply a job result. Returns `false` if the job's lease was stale.
    async fn finalize_job(&self, job: &NextJob, result: Result<(), SyncError>) -> bool {
        let id = job.presentation.id;
        let mut state = self.state.lock().await;

        if !state.active.as_ref().is_some_and(|a| a.lease == job.lease) {
            tracing::debug!(
                target: "smartlib.download",
                id = %id,
                "Ignoring stale completion (lease mismatch)"
            );
            return false;
        }
        state.active = None;

        match result {
            Ok(()) => {
                state.policy.record_success(&id);
                if let Some(run) = state.run.as_mut() {
                    run.record_outcome(id, ItemOutcome::Loaded);
                }
                tracing::debug!(target: "smartlib.download", id = %id, "Presentation loaded");
                self.observer.emit(BatchEvent::Loaded { id });
            }
            Err(error) => self.handle_failure(&mut state, job.slot, id, &error),
        }

        true
    }

    fn handle_failure(
        &self,
        state: &mut BatchState,
        slot: SlotId,
        id: PresentationId,
        error: &SyncError,
    ) {
        let attempt = state.queue.get(slot).map_or(1, |item| item.attempts);
        if let Some(run) = state.run.as_mut() {
            run.record_outcome(id, ItemOutcome::Failed);
        }

        if state.policy.should_retry(&id, error) {
            // Already pending if a later `add_presentations` re-listed it.
            state.queue.requeue(slot);
            tracing::debug!(
                target: "smartlib.download",
                id = %id,
                attempt,
                error = %error,
                "Presentation sync failed, requeued"
            );
            self.observer.emit(BatchEvent::Requeued {
                id,
                attempt,
                error: error.to_string(),
            });
        } else {
            tracing::warn!(
                target: "smartlib.download",
                id = %id,
                attempt,
                error = %error,
                "Presentation sync failed, giving up"
            );
            self.observer.emit(BatchEvent::Failed {
                id,
                error: error.to_string(),
            });
        }
    }

    /// Reset batch state and emit the single `Done` for this batch.
    fn finish_batch(
        &self,
        state: &mut BatchState,
        canceled: bool,
        in_flight: Option<PresentationId>,
    ) {
        let summary = state.run.take().map_or_else(
            || BatchSummary::empty(canceled),
            |run| run.finish(canceled, in_flight),
        );

        state.queue.clear();
        state.active = None;
        state.runner = None;
        state.policy.reset();
        state.done_reported = true;

        tracing::info!(
            target: "smartlib.download",
            batch_id = %summary.batch_id,
            canceled,
            loaded = summary.loaded().len(),
            failed = summary.failed().len(),
            total_attempts = summary.total_attempts(),
            "Batch loading finished"
        );

        self.observer.emit(BatchEvent::Done { canceled, summary });
    }

    /// Spawn a progress bridge task that rate-limits event emission.
    fn spawn_progress_bridge(
        self: &Arc<Self>,
        lease: LeaseId,
        id: PresentationId,
        mut rx: watch::Receiver<SyncProgress>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut throttle = ProgressThrottle::new(self.config.progress_interval);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => {
                        // No progress after a cancel; `Done` is final
                        break;
                    }

                    changed = rx.changed() => {
                        // A closed channel means the transfer ended: flush.
                        let closed = changed.is_err();
                        let current = *rx.borrow_and_update();

                        if throttle.admit(&current, closed) {
                            manager.forward_progress(lease, id, current).await;
                        }

                        if closed {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Emit a progress event if `lease` still holds the current item.
    async fn forward_progress(&self, lease: LeaseId, id: PresentationId, progress: SyncProgress) {
        let state = self.state.lock().await;
        if state.active.as_ref().is_some_and(|job| job.lease == lease) {
            self.observer.emit(BatchEvent::Progress {
                id,
                fraction: progress.fraction(),
                completed: progress.completed,
                total: progress.total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartlib_core::NoopBatchObserver;

    struct InstantSync;

    #[async_trait::async_trait]
    impl PresentationSynchronizerPort for InstantSync {
        async fn synchronize(
            &self,
            _presentation: &Presentation,
            _progress: watch::Sender<SyncProgress>,
        ) -> Result<(), SyncError> {
            Ok(())
        }

        fn cancel(&self, _id: &PresentationId) {}
    }

    fn manager() -> Arc<BatchLoadingManager> {
        build_batch_manager(BatchLoadingManagerDeps {
            synchronizer: Arc::new(InstantSync),
            observer: Arc::new(NoopBatchObserver::new()),
            settings: SyncSettings::with_defaults(),
        })
        .unwrap()
    }

    #[test]
    fn lease_id_equality() {
        assert_eq!(LeaseId(1), LeaseId(1));
        assert_ne!(LeaseId(1), LeaseId(2));
    }

    #[test]
    fn build_rejects_out_of_range_settings() {
        let result = build_batch_manager(BatchLoadingManagerDeps {
            synchronizer: Arc::new(InstantSync),
            observer: Arc::new(NoopBatchObserver::new()),
            settings: SyncSettings {
                max_fail_count: Some(0),
                ..SyncSettings::with_defaults()
            },
        });

        assert_eq!(
            result.err(),
            Some(SettingsError::InvalidMaxFailCount(0))
        );
    }

    #[test]
    fn config_from_settings() {
        let settings = SyncSettings {
            progress_interval_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(
            BatchManagerConfig::from_settings(&settings).progress_interval,
            Duration::ZERO
        );
        assert_eq!(
            BatchManagerConfig::default().progress_interval,
            Duration::from_millis(100)
        );
    }

    #[tokio::test]
    async fn add_presentations_fills_snapshot() {
        let manager = manager();
        let total = manager
            .add_presentations(vec![Presentation::new(1), Presentation::new(2)])
            .await;

        assert_eq!(total, 2);
        let snapshot = manager.snapshot().await;
        assert_eq!(
            snapshot.pending,
            vec![PresentationId::new(1), PresentationId::new(2)]
        );
        assert!(!snapshot.running);
        assert!(snapshot.current.is_none());
    }

    #[tokio::test]
    async fn cancel_clears_pending_queue() {
        let manager = manager();
        manager.add_presentations(vec![Presentation::new(1)]).await;

        manager.cancel_loading().await;

        let snapshot = manager.snapshot().await;
        assert!(snapshot.is_idle());
        assert!(snapshot.canceled);
    }
}
