//! Sync domain types: errors, progress, batch events, snapshots and summaries.
//!
//! This module contains pure data types for the batch loading subsystem.
//! No I/O, networking, or runtime dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Progress values reported by a synchronizer (`SyncProgress`)
//! - `events` - Batch lifecycle events (`BatchEvent`)
//! - `errors` - Error type for single-presentation sync (`SyncError`)
//! - `queue` - Queue snapshot DTO (`BatchSnapshot`)
//! - `summary` - Batch completion tracking (`BatchSummary`)

pub mod errors;
pub mod events;
pub mod queue;
pub mod summary;
pub mod types;

pub use errors::{SyncError, SyncResult};
pub use events::BatchEvent;
pub use queue::BatchSnapshot;
pub use summary::{AttemptCounts, BatchSummary, ItemOutcome, ItemSummary};
pub use types::SyncProgress;
