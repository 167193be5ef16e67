//! Rate limiting for forwarded progress.

use std::time::{Duration, Instant};

use smartlib_core::SyncProgress;

/// Decides which progress snapshots of one transfer reach the observer.
///
/// A snapshot is admitted when it is newer than the last admitted one and
/// either the interval has elapsed, the transfer is complete, or the caller
/// is flushing the final value.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_at: Option<Instant>,
    last_seq: u64,
}

impl ProgressThrottle {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_at: None,
            last_seq: 0,
        }
    }

    /// Whether `progress` should be forwarded. Admitting it records it.
    pub fn admit(&mut self, progress: &SyncProgress, flush: bool) -> bool {
        if progress.seq <= self.last_seq {
            return false;
        }

        let now = Instant::now();
        let complete = progress.total > 0 && progress.completed >= progress.total;
        let due = self
            .last_at
            .is_none_or(|last| now.duration_since(last) >= self.interval);

        if flush || complete || due {
            self.last_at = Some(now);
            self.last_seq = progress.seq;
            true
        } else {
            false
        }
    }

    /// Sequence number of the last admitted snapshot (0 if none).
    pub const fn last_seq(&self) -> u64 {
        self.last_seq
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(
            smartlib_core::settings::DEFAULT_PROGRESS_INTERVAL_MS,
        ))
    }
}
