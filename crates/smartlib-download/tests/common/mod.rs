//! Shared fixtures for batch loader integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc, watch};

use smartlib_core::{
    BatchEvent, ChannelBatchObserver, Presentation, PresentationId, PresentationSynchronizerPort,
    SyncError, SyncProgress,
};

/// What the scripted synchronizer does for one attempt.
#[derive(Clone)]
pub enum Step {
    Succeed,
    Fail(SyncError),
    /// Never resolves; only a cancel ends it.
    Hang,
    /// Resolves successfully once the gate is notified.
    Gate(Arc<Notify>),
}

/// Synchronizer that plays back per-presentation scripts.
///
/// Presentations without a script (or with an exhausted one) succeed.
#[derive(Default)]
pub struct ScriptedSynchronizer {
    scripts: Mutex<HashMap<PresentationId, VecDeque<Step>>>,
    calls: Mutex<Vec<PresentationId>>,
    cancels: Mutex<Vec<PresentationId>>,
}

impl ScriptedSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn script(self, id: i64, steps: impl IntoIterator<Item = Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(PresentationId::new(id), steps.into_iter().collect());
        self
    }

    /// Presentations passed to `synchronize`, in call order.
    pub fn calls(&self) -> Vec<PresentationId> {
        self.calls.lock().unwrap().clone()
    }

    /// Presentations passed to `cancel`, in call order.
    pub fn cancels(&self) -> Vec<PresentationId> {
        self.cancels.lock().unwrap().clone()
    }

    fn next_step(&self, id: PresentationId) -> Step {
        self.calls.lock().unwrap().push(id);
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Succeed)
    }
}

fn report(progress: &watch::Sender<SyncProgress>, completed: u64) {
    progress.send_modify(|p| {
        p.completed = completed;
        p.total = 100;
        p.seq += 1;
    });
}

#[async_trait]
impl PresentationSynchronizerPort for ScriptedSynchronizer {
    async fn synchronize(
        &self,
        presentation: &Presentation,
        progress: watch::Sender<SyncProgress>,
    ) -> Result<(), SyncError> {
        let step = self.next_step(presentation.id);

        report(&progress, 50);
        tokio::task::yield_now().await;

        match step {
            Step::Succeed => {
                report(&progress, 100);
                Ok(())
            }
            Step::Fail(error) => Err(error),
            Step::Hang => std::future::pending().await,
            Step::Gate(gate) => {
                gate.notified().await;
                report(&progress, 100);
                Ok(())
            }
        }
    }

    fn cancel(&self, id: &PresentationId) {
        self.cancels.lock().unwrap().push(*id);
    }
}

pub fn presentations(ids: &[i64]) -> Vec<Presentation> {
    ids.iter()
        .map(|id| Presentation::new(*id).with_name(format!("Deck {id}")))
        .collect()
}

pub fn offline() -> SyncError {
    SyncError::network("offline")
}

/// Observer whose events are read back from a channel.
pub fn observer() -> (Arc<ChannelBatchObserver>, mpsc::UnboundedReceiver<BatchEvent>) {
    let (observer, rx) = ChannelBatchObserver::new();
    (Arc::new(observer), rx)
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<BatchEvent>) -> BatchEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a batch event")
        .expect("observer channel closed")
}

/// Collect events up to and including `Done`.
pub async fn collect_until_done(rx: &mut mpsc::UnboundedReceiver<BatchEvent>) -> Vec<BatchEvent> {
    collect_until(rx, BatchEvent::is_done).await
}

/// Collect events up to and including the first one matching `pred`.
pub async fn collect_until(
    rx: &mut mpsc::UnboundedReceiver<BatchEvent>,
    pred: impl Fn(&BatchEvent) -> bool,
) -> Vec<BatchEvent> {
    let mut events = Vec::new();
    loop {
        let event = next_event(rx).await;
        let matched = pred(&event);
        events.push(event);
        if matched {
            return events;
        }
    }
}

pub fn is_started(id: i64) -> impl Fn(&BatchEvent) -> bool {
    move |event| matches!(event, BatchEvent::Started { id: started, .. } if started.get() == id)
}

/// Assert nothing else arrives within a short grace period.
pub async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<BatchEvent>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Ok(event) = rx.try_recv() {
        panic!("unexpected event after batch end: {event:?}");
    }
}

/// Compact lifecycle trace without progress events, e.g. `started:1`.
pub fn lifecycle(events: &[BatchEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            BatchEvent::Prepare { total } => Some(format!("prepare:{total}")),
            BatchEvent::Progress { .. } => None,
            BatchEvent::Done { canceled, .. } => Some(format!("done:{canceled}")),
            other => other
                .presentation_id()
                .map(|id| format!("{}:{id}", other.name())),
        })
        .collect()
}

/// Assert every progress event belongs to the item started most recently
/// and arrives before that item's terminal event.
pub fn assert_progress_scoped(events: &[BatchEvent]) {
    let mut current = None;
    for event in events {
        match event {
            BatchEvent::Started { id, .. } => current = Some(*id),
            BatchEvent::Progress { id, fraction, .. } => {
                assert_eq!(Some(*id), current, "progress outside its item: {event:?}");
                assert!((0.0..=1.0).contains(fraction));
            }
            BatchEvent::Loaded { .. }
            | BatchEvent::Requeued { .. }
            | BatchEvent::Failed { .. }
            | BatchEvent::Done { .. } => current = None,
            BatchEvent::Prepare { .. } => {}
        }
    }
}
