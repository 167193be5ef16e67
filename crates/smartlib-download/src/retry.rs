//! Retry policies for the batch loader.

use std::collections::HashMap;

use smartlib_core::{DEFAULT_MAX_FAIL_COUNT, PresentationId, RetryPolicy, SyncError};

/// Retries each presentation until it has failed `max_fail_count` times.
///
/// With the default of 2 a presentation gets two attempts: the first
/// failure re-queues it, the second abandons it. A success clears the
/// presentation's count.
#[derive(Debug, Clone)]
pub struct BoundedRetry {
    max_fail_count: u32,
    failures: HashMap<PresentationId, u32>,
}

impl BoundedRetry {
    /// `max_fail_count` is clamped to at least 1.
    pub fn new(max_fail_count: u32) -> Self {
        Self {
            max_fail_count: max_fail_count.max(1),
            failures: HashMap::new(),
        }
    }

    pub const fn max_fail_count(&self) -> u32 {
        self.max_fail_count
    }

    /// Failures recorded for `id` since its last success or reset.
    pub fn failure_count(&self, id: &PresentationId) -> u32 {
        self.failures.get(id).copied().unwrap_or(0)
    }
}

impl Default for BoundedRetry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAIL_COUNT)
    }
}

impl RetryPolicy for BoundedRetry {
    fn should_retry(&mut self, id: &PresentationId, _error: &SyncError) -> bool {
        let count = self.failures.entry(*id).or_insert(0);
        *count += 1;
        *count < self.max_fail_count
    }

    fn record_success(&mut self, id: &PresentationId) {
        self.failures.remove(id);
    }

    fn reset(&mut self) {
        self.failures.clear();
    }
}

/// Abandons every presentation on its first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn should_retry(&mut self, _id: &PresentationId, _error: &SyncError) -> bool {
        false
    }

    fn record_success(&mut self, _id: &PresentationId) {}

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> SyncError {
        SyncError::network("timeout")
    }

    #[test]
    fn test_default_allows_one_retry() {
        let mut policy = BoundedRetry::default();
        let id = PresentationId::new(1);

        assert!(policy.should_retry(&id, &timeout()));
        assert!(!policy.should_retry(&id, &timeout()));
        assert_eq!(policy.failure_count(&id), 2);
    }

    #[test]
    fn test_counts_are_per_presentation() {
        let mut policy = BoundedRetry::new(2);
        let a = PresentationId::new(1);
        let b = PresentationId::new(2);

        assert!(policy.should_retry(&a, &timeout()));
        assert!(policy.should_retry(&b, &timeout()));
        assert_eq!(policy.failure_count(&a), 1);
    }

    #[test]
    fn test_success_clears_count() {
        let mut policy = BoundedRetry::new(2);
        let id = PresentationId::new(1);

        assert!(policy.should_retry(&id, &timeout()));
        policy.record_success(&id);
        assert_eq!(policy.failure_count(&id), 0);
        assert!(policy.should_retry(&id, &timeout()));
    }

    #[test]
    fn test_reset_and_zero_clamp() {
        let mut policy = BoundedRetry::new(0);
        assert_eq!(policy.max_fail_count(), 1);

        let id = PresentationId::new(1);
        assert!(!policy.should_retry(&id, &timeout()));
        policy.reset();
        assert_eq!(policy.failure_count(&id), 0);
    }

    #[test]
    fn test_never_retry() {
        let mut policy = NeverRetry;
        assert!(!policy.should_retry(&PresentationId::new(1), &timeout()));
    }
}
