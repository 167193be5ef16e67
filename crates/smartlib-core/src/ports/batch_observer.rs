//! Batch observer port.
//!
//! This port abstracts batch event delivery, allowing the batch loader to
//! report lifecycle changes without coupling to how a host renders them.

use tokio::sync::mpsc;

use crate::download::BatchEvent;

/// Port for receiving batch loader events.
///
/// Events for one batch arrive in lifecycle order from the loader's own
/// task. Implementations must not block and must not call back into the
/// loader from `emit`; hosts that render on a UI thread should forward
/// through [`ChannelBatchObserver`] and drain the receiver there.
pub trait BatchObserverPort: Send + Sync {
    fn emit(&self, event: BatchEvent);
}

/// Observer that discards all events.
///
/// Suitable for unit tests and headless batch runs that only care about
/// on-disk results.
#[derive(Debug, Clone, Default)]
pub struct NoopBatchObserver;

impl NoopBatchObserver {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BatchObserverPort for NoopBatchObserver {
    fn emit(&self, _event: BatchEvent) {
        // Intentionally do nothing
    }
}

/// Observer that forwards every event into an unbounded channel.
///
/// The receiver side is where a host marshals events onto its UI context.
#[derive(Debug, Clone)]
pub struct ChannelBatchObserver {
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl ChannelBatchObserver {
    /// Create an observer and the receiver its events arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl BatchObserverPort for ChannelBatchObserver {
    fn emit(&self, event: BatchEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!(target: "smartlib.download", "Batch event receiver dropped");
        }
    }
}
