//! Progress values reported by a synchronizer.

use serde::{Deserialize, Serialize};

/// Progress of one presentation transfer, sent through a `watch` channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// Bytes fetched so far.
    pub completed: u64,
    /// Total bytes expected (0 if unknown).
    pub total: u64,
    /// Monotonically increasing sequence number for change detection.
    pub seq: u64,
}

impl SyncProgress {
    pub const fn new(completed: u64, total: u64, seq: u64) -> Self {
        Self {
            completed,
            total,
            seq,
        }
    }

    /// Completed fraction in `0.0..=1.0`; `0.0` while the total is unknown.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.completed as f64 / self.total as f64;
        fraction.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_with_unknown_total_is_zero() {
        assert!(SyncProgress::new(512, 0, 1).fraction().abs() < f64::EPSILON);
    }

    #[test]
    fn fraction_is_clamped() {
        assert!((SyncProgress::new(50, 200, 1).fraction() - 0.25).abs() < f64::EPSILON);
        assert!((SyncProgress::new(300, 200, 2).fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_has_zero_seq() {
        assert_eq!(SyncProgress::default().seq, 0);
    }
}
