//! Per-batch run state (for completion tracking).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use smartlib_core::{AttemptCounts, BatchSummary, ItemOutcome, ItemSummary, PresentationId};

/// Aggregated attempts for a single presentation.
#[derive(Debug, Clone)]
struct ItemAggregate {
    display_name: String,
    attempts: AttemptCounts,
    last_result: Option<ItemOutcome>,
}

/// State for tracking one batch, from `start_loading` to `Done`.
#[derive(Debug)]
pub(super) struct BatchRunState {
    batch_id: Uuid,
    started_at: DateTime<Utc>,
    /// Keyed by presentation, in the order items first started.
    items: IndexMap<PresentationId, ItemAggregate>,
}

impl BatchRunState {
    pub(super) fn new() -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            started_at: Utc::now(),
            items: IndexMap::new(),
        }
    }

    pub(super) const fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// Note that `id` became the current item.
    pub(super) fn record_start(&mut self, id: PresentationId, display_name: &str) {
        self.items.entry(id).or_insert_with(|| ItemAggregate {
            display_name: display_name.to_string(),
            attempts: AttemptCounts::default(),
            last_result: None,
        });
    }

    /// Record the result of one attempt.
    pub(super) fn record_outcome(&mut self, id: PresentationId, outcome: ItemOutcome) {
        if let Some(agg) = self.items.get_mut(&id) {
            agg.attempts.increment(outcome);
            agg.last_result = Some(outcome);
        }
    }

    /// Close the run. `in_flight` is the item interrupted by a cancel, if any.
    pub(super) fn finish(mut self, canceled: bool, in_flight: Option<PresentationId>) -> BatchSummary {
        if let Some(id) = in_flight {
            self.record_outcome(id, ItemOutcome::Cancelled);
        }

        let items = self
            .items
            .into_iter()
            .map(|(id, agg)| ItemSummary {
                id,
                display_name: agg.display_name,
                attempts: agg.attempts,
                outcome: agg.last_result,
            })
            .collect();

        BatchSummary {
            batch_id: self.batch_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            canceled,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retried_item_aggregates_attempts() {
        let a = PresentationId::new(1);
        let b = PresentationId::new(2);
        let mut run = BatchRunState::new();

        run.record_start(a, "A");
        run.record_outcome(a, ItemOutcome::Failed);
        run.record_start(b, "B");
        run.record_outcome(b, ItemOutcome::Loaded);
        run.record_start(a, "A");
        run.record_outcome(a, ItemOutcome::Loaded);

        let summary = run.finish(false, None);

        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.items[0].id, a);
        assert_eq!(summary.items[0].attempts.total(), 2);
        assert_eq!(summary.items[0].outcome, Some(ItemOutcome::Loaded));
        assert!(summary.is_success());
        assert!(summary.has_retries());
    }

    #[test]
    fn cancel_marks_in_flight_item() {
        let a = PresentationId::new(1);
        let mut run = BatchRunState::new();
        run.record_start(a, "A");

        let summary = run.finish(true, Some(a));

        assert!(summary.canceled);
        assert_eq!(summary.items[0].outcome, Some(ItemOutcome::Cancelled));
        assert_eq!(summary.items[0].attempts.cancelled, 1);
    }

    #[test]
    fn outcome_without_start_is_ignored() {
        let mut run = BatchRunState::new();
        run.record_outcome(PresentationId::new(9), ItemOutcome::Loaded);

        assert!(run.finish(false, None).items.is_empty());
    }
}
