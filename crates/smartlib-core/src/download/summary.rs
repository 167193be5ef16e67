//! Batch completion summary types.
//!
//! A batch summary accumulates every attempt made between `start_loading`
//! and the `Done` event, keyed by presentation. It is what a host uses to
//! decide whether the batch succeeded and which presentations still need
//! attention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::presentation::PresentationId;

/// Final outcome of one presentation within a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Synchronized successfully.
    Loaded,
    /// Abandoned after the retry policy declined another attempt.
    Failed,
    /// The batch was cancelled before this item finished.
    Cancelled,
}

/// Counts of attempts by result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounts {
    pub loaded: u32,
    pub failed: u32,
    pub cancelled: u32,
}

impl AttemptCounts {
    /// Record one attempt with the given result.
    pub const fn increment(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Loaded => self.loaded += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::Cancelled => self.cancelled += 1,
        }
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.loaded + self.failed + self.cancelled
    }

    /// More than one attempt was made.
    #[must_use]
    pub const fn has_retries(&self) -> bool {
        self.total() > 1
    }
}

/// Per-presentation record in a batch summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: PresentationId,
    pub display_name: String,
    pub attempts: AttemptCounts,
    /// Result of the last attempt; `None` if the item never started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ItemOutcome>,
}

/// Summary of one batch from `start_loading` to `Done`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub canceled: bool,
    /// Items in the order they first started.
    pub items: Vec<ItemSummary>,
}

impl BatchSummary {
    /// An empty summary for a batch that never ran anything.
    #[must_use]
    pub fn empty(canceled: bool) -> Self {
        let now = Utc::now();
        Self {
            batch_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            canceled,
            items: Vec::new(),
        }
    }

    /// Presentations whose last attempt loaded.
    pub fn loaded(&self) -> Vec<PresentationId> {
        self.ids_with(ItemOutcome::Loaded)
    }

    /// Presentations abandoned after failing.
    pub fn failed(&self) -> Vec<PresentationId> {
        self.ids_with(ItemOutcome::Failed)
    }

    /// Not cancelled and nothing abandoned.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.canceled && self.items.iter().all(|i| i.outcome != Some(ItemOutcome::Failed))
    }

    /// Total attempts across all items.
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.items.iter().map(|i| i.attempts.total()).sum()
    }

    pub fn has_retries(&self) -> bool {
        self.items.iter().any(|i| i.attempts.has_retries())
    }

    fn ids_with(&self, outcome: ItemOutcome) -> Vec<PresentationId> {
        self.items
            .iter()
            .filter(|i| i.outcome == Some(outcome))
            .map(|i| i.id)
            .collect()
    }
}
