//! Batch events - discriminated union for every batch lifecycle change.

use serde::{Deserialize, Serialize};

use super::summary::BatchSummary;
use crate::presentation::PresentationId;

/// Single discriminated union for all batch loader events.
///
/// For one batch the observer sees:
///
/// ```text
/// prepare → ( started → progress* → loaded | requeued | failed )* → done
/// ```
///
/// `done` is emitted exactly once per batch, either when the queue drains
/// or when the batch is cancelled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// The pending queue was replaced.
    Prepare {
        /// Number of presentations now queued.
        total: usize,
    },

    /// A presentation became the current item.
    Started {
        id: PresentationId,
        /// Display name for progress text.
        name: String,
        /// 1-based attempt number within this batch.
        attempt: u32,
    },

    /// Progress of the current item.
    Progress {
        id: PresentationId,
        /// Completed fraction (0.0 - 1.0).
        fraction: f64,
        completed: u64,
        total: u64,
    },

    /// The current item synchronized successfully.
    Loaded { id: PresentationId },

    /// The current item failed and was re-appended to the tail of the queue.
    Requeued {
        id: PresentationId,
        /// Attempts made so far.
        attempt: u32,
        error: String,
    },

    /// The current item failed and was abandoned for this batch.
    Failed { id: PresentationId, error: String },

    /// The batch is over.
    Done {
        canceled: bool,
        summary: BatchSummary,
    },
}

impl BatchEvent {
    /// Presentation this event refers to, if any.
    pub const fn presentation_id(&self) -> Option<PresentationId> {
        match self {
            Self::Started { id, .. }
            | Self::Progress { id, .. }
            | Self::Loaded { id }
            | Self::Requeued { id, .. }
            | Self::Failed { id, .. } => Some(*id),
            Self::Prepare { .. } | Self::Done { .. } => None,
        }
    }

    /// Whether this is the batch terminator.
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Snake-case event name (matches the serde tag).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Prepare { .. } => "prepare",
            Self::Started { .. } => "started",
            Self::Progress { .. } => "progress",
            Self::Loaded { .. } => "loaded",
            Self::Requeued { .. } => "requeued",
            Self::Failed { .. } => "failed",
            Self::Done { .. } => "done",
        }
    }
}
