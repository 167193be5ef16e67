//! Batch queue snapshot DTO.

use serde::{Deserialize, Serialize};

use crate::presentation::PresentationId;

/// Point-in-time view of a batch loader, for hosts that poll.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    /// Item currently synchronizing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<PresentationId>,
    /// Waiting items in download order.
    pub pending: Vec<PresentationId>,
    /// A runner is draining the queue.
    pub running: bool,
    /// The last batch was cancelled and nothing has started since.
    pub canceled: bool,
}

impl BatchSnapshot {
    /// Nothing current and nothing pending.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// Current item plus pending items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pending.len() + if self.current.is_some() { 1 } else { 0 }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.is_idle()
    }

    /// 1-based position; the current item is position 1.
    pub fn position(&self, id: PresentationId) -> Option<usize> {
        if self.current == Some(id) {
            return Some(1);
        }
        let base = if self.current.is_some() { 2 } else { 1 };
        self.pending.iter().position(|p| *p == id).map(|idx| base + idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_counts_current_first() {
        let snapshot = BatchSnapshot {
            current: Some(PresentationId::new(5)),
            pending: vec![PresentationId::new(6), PresentationId::new(7)],
            running: true,
            canceled: false,
        };

        assert_eq!(snapshot.position(PresentationId::new(5)), Some(1));
        assert_eq!(snapshot.position(PresentationId::new(7)), Some(3));
        assert_eq!(snapshot.position(PresentationId::new(8)), None);
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn default_is_idle() {
        assert!(BatchSnapshot::default().is_idle());
    }
}
