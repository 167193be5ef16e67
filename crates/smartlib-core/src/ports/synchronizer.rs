//! Single-presentation synchronizer port.
//!
//! The batch loader never fetches content itself. It drives one
//! implementation of this port, one presentation at a time.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::download::{SyncError, SyncProgress};
use crate::presentation::{Presentation, PresentationId};

/// Port for fetching and installing one presentation's content package.
///
/// # Contract
///
/// - `synchronize` reports progress through `progress` (bump `seq` on every
///   update) and resolves once the content is installed or the attempt
///   failed. Dropping the sender signals that no more progress will follow.
/// - `cancel` is best-effort and must not block. A cancelled transfer
///   should resolve with [`SyncError::Cancelled`], but callers tolerate any
///   late result.
#[async_trait]
pub trait PresentationSynchronizerPort: Send + Sync {
    /// Fetch and install the content package of `presentation`.
    async fn synchronize(
        &self,
        presentation: &Presentation,
        progress: watch::Sender<SyncProgress>,
    ) -> Result<(), SyncError>;

    /// Ask the in-flight transfer for `id` (if any) to stop.
    fn cancel(&self, id: &PresentationId);
}
