//! Batch queue management.
//!
//! This module provides a pure state machine for the batch queue. No I/O is
//! performed here; the orchestrator (`BatchLoadingManager`) handles I/O.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO, no tracing)
//! - Items live in an arena addressed by [`SlotId`]; the pending FIFO holds
//!   slot handles only
//! - Retried items re-enter at the tail of the FIFO

mod types;

use std::collections::{HashSet, VecDeque};

use smartlib_core::{Presentation, PresentationId};

pub use types::{QueuedItem, SlotId};

/// Manages the batch queue state.
///
/// Has no internal locking; `BatchLoadingManager` keeps it behind its
/// state mutex.
#[derive(Debug, Default)]
pub struct BatchQueue {
    slots: Vec<QueuedItem>,
    pending: VecDeque<SlotId>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything not yet started with `presentations`.
    ///
    /// Duplicate ids within `presentations` keep their first occurrence.
    /// Existing slots are retained so a handle to the current item remains
    /// valid. Returns the number of items now pending.
    pub fn replace(&mut self, presentations: Vec<Presentation>) -> usize {
        self.pending.clear();

        let mut seen = HashSet::new();
        for presentation in presentations {
            if !seen.insert(presentation.id) {
                continue;
            }
            let slot = SlotId::new(self.slots.len());
            self.slots.push(QueuedItem::new(presentation));
            self.pending.push_back(slot);
        }

        self.pending.len()
    }

    /// Pop the next item from the front of the queue and count the attempt.
    ///
    /// Returns the slot handle with a copy of the item as dequeued.
    pub fn dequeue(&mut self) -> Option<(SlotId, QueuedItem)> {
        while let Some(slot) = self.pending.pop_front() {
            if let Some(item) = self.slots.get_mut(slot.index()) {
                item.attempts += 1;
                return Some((slot, item.clone()));
            }
        }
        None
    }

    pub fn get(&self, slot: SlotId) -> Option<&QueuedItem> {
        self.slots.get(slot.index())
    }

    /// Re-append a dequeued slot at the tail.
    ///
    /// Returns `false` if the slot is unknown or its presentation is
    /// already pending (e.g. re-added by a later `replace`).
    pub fn requeue(&mut self, slot: SlotId) -> bool {
        let Some(id) = self.get(slot).map(QueuedItem::id) else {
            return false;
        };
        if self.is_pending(id) {
            return false;
        }
        self.pending.push_back(slot);
        true
    }

    /// Check if a presentation is waiting in the queue.
    pub fn is_pending(&self, id: PresentationId) -> bool {
        self.pending
            .iter()
            .filter_map(|slot| self.get(*slot))
            .any(|item| item.id() == id)
    }

    /// Drop every slot and the pending list.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.slots.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending presentation ids in download order.
    pub fn pending_ids(&self) -> Vec<PresentationId> {
        self.pending
            .iter()
            .filter_map(|slot| self.get(*slot))
            .map(QueuedItem::id)
            .collect()
    }
}
