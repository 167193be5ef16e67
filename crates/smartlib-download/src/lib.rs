//! Batch loading for smartlib presentations.
//!
//! `BatchLoadingManager` drains an ordered queue of presentations one at a
//! time through a [`PresentationSynchronizerPort`], defers every failure to a
//! [`RetryPolicy`] and reports lifecycle changes to a [`BatchObserverPort`].
//! `HttpPackageSynchronizer` is the production synchronizer: it downloads a
//! presentation's content package over HTTP and installs it on disk.
//!
//! # Modules
//!
//! - `manager` - The batch loader and its per-batch run state
//! - `queue` - Pure queue state machine (arena + FIFO)
//! - `retry` - Bounded and fail-fast retry policies
//! - `progress` - Progress throttling
//! - `package` - HTTP download, unpack and install of content packages

// Re-export core types for convenience
pub use smartlib_core::download::{
    BatchEvent, BatchSnapshot, BatchSummary, ItemOutcome, SyncError, SyncProgress,
};
pub use smartlib_core::ports::{
    BatchObserverPort, ChannelBatchObserver, NoopBatchObserver, PresentationSynchronizerPort,
    RetryPolicy,
};

// Internal modules (pub(crate) to keep implementation private)
pub(crate) mod progress;
pub(crate) mod queue;

// Re-export progress throttle for consumers (adapters)
pub use progress::ProgressThrottle;

mod retry;
pub use retry::{BoundedRetry, NeverRetry};

mod package;
pub use package::{HttpPackageSynchronizer, InstallManifest, PackageDestination, PackageSyncConfig};

mod manager;
pub use manager::{
    BatchLoadingManager, BatchLoadingManagerDeps, BatchManagerConfig, build_batch_manager,
};
