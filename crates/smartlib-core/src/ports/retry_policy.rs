//! Retry policy port.
//!
//! The batch loader is policy-agnostic: when a presentation fails it asks
//! the policy whether to re-append it to the tail of the queue. All failure
//! bookkeeping lives in the policy.

use crate::download::SyncError;
use crate::presentation::PresentationId;

/// Decides whether a failed presentation gets another attempt.
///
/// The loader owns its policy and calls it only from its own task, so
/// implementations may keep plain mutable state.
pub trait RetryPolicy: Send {
    /// Called once per failed attempt. `true` re-queues the presentation at
    /// the tail; `false` abandons it for the rest of the batch.
    fn should_retry(&mut self, id: &PresentationId, error: &SyncError) -> bool;

    /// Called when a presentation loads.
    fn record_success(&mut self, id: &PresentationId);

    /// Called when a batch finishes or is cancelled.
    fn reset(&mut self);
}
