use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset, TimeDelta};
use compact_str::{CompactString, format_compact};
use hashbrown::HashSet;

pub fn dedup_key(issue_id: &str, comment_time: &str) -> CompactString {
    format_compact!("{issue_id}_{comment_time}")
}

/// Whether the comment plausibly caused the issue's last modification.
///
/// The tracker does not link history events to bugnotes, so the two
/// minute-resolution timestamps are compared instead. Several comments posted
/// within the tolerance, or a skewed clock, defeat this check.
pub fn caused_modification(
    last_modified: DateTime<FixedOffset>,
    comment: DateTime<FixedOffset>,
    tolerance: TimeDelta,
) -> bool {
    (last_modified - comment).abs() <= tolerance
}

/// Dedup keys of comments already relayed. Holds at most `capacity` keys and
/// forgets the oldest first.
#[derive(Debug)]
pub struct SentCache {
    capacity: usize,
    keys: HashSet<CompactString>,
    order: VecDeque<CompactString>,
}

impl SentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            keys: HashSet::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Returns `false` if the key was already present.
    pub fn insert(&mut self, key: CompactString) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        while self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                tracing::debug!(target: "sent-cache", "evicting {evicted}");
                self.keys.remove(&evicted);
            }
        }
        self.order.push_back(key.clone());
        self.keys.insert(key);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
