//! Core domain types and port definitions for presentation sync.
//!
//! This crate holds the pure data types (presentations, sync errors, batch
//! events) and the trait seams the batch loader talks through. It performs
//! no network or filesystem I/O; `smartlib-download` supplies the
//! orchestration and the concrete synchronizer.
//!
//! # Modules
//!
//! - `presentation` - Presentation identity, content packages, sync-status predicates
//! - `download` - Sync errors, progress, batch events, snapshots and summaries
//! - `ports` - Synchronizer, observer and retry-policy traits
//! - `settings` - Sync configuration and validation

#![deny(unused_crate_dependencies)]

pub mod download;
pub mod ports;
pub mod presentation;
pub mod settings;

// Re-export commonly used types for convenience
pub use download::{
    AttemptCounts, BatchEvent, BatchSnapshot, BatchSummary, ItemOutcome, ItemSummary, SyncError,
    SyncProgress, SyncResult,
};
pub use ports::{
    BatchObserverPort, ChannelBatchObserver, NoopBatchObserver, PresentationSynchronizerPort,
    RetryPolicy,
};
pub use presentation::{
    Availability, ContentPackage, Presentation, PresentationId, SyncStatus, TransferState,
    select_for_sync,
};
pub use settings::{
    DEFAULT_MAX_FAIL_COUNT, DEFAULT_PROGRESS_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS,
    SettingsError, SyncSettings, validate_settings,
};

#[cfg(test)]
use serde_json as _;
