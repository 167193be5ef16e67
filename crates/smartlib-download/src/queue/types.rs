//! Queue item types (internal implementation).
//!
//! For API responses, use `smartlib_core::download::BatchSnapshot`.

use std::time::Instant;

use smartlib_core::{Presentation, PresentationId};

/// Handle to an item in the queue's arena.
///
/// Slots are never reused within a batch, so a handle taken for the
/// current item stays valid while the pending list is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

/// A presentation owned by the queue.
#[derive(Clone, Debug)]
pub struct QueuedItem {
    pub presentation: Presentation,
    /// When this item was queued (for ordering/debugging).
    pub queued_at: Instant,
    /// Times this item has been dequeued within the batch.
    pub attempts: u32,
}

impl QueuedItem {
    pub fn new(presentation: Presentation) -> Self {
        Self {
            presentation,
            queued_at: Instant::now(),
            attempts: 0,
        }
    }

    pub const fn id(&self) -> PresentationId {
        self.presentation.id
    }
}
