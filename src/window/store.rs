//! Fixed-capacity sample history with absolute sequence numbers.

use std::collections::VecDeque;
use std::ops::Range;

/// Entries kept per unit of window size.
pub const HISTORY_FACTOR: usize = 1000;

/// One accepted sample.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowEntry {
    /// Seconds since the session started
    pub elapsed: f64,
    /// One value per extraction rule, in rule order
    pub values: Vec<f64>,
    /// The sample text the values came from
    pub raw: String,
}

impl WindowEntry {
    pub fn new(elapsed: f64, values: Vec<f64>, raw: impl Into<String>) -> Self {
        Self {
            elapsed,
            values,
            raw: raw.into(),
        }
    }
}

/// Fixed-capacity history of entries in arrival order.
///
/// Every entry gets an absolute sequence number from a write counter that
/// never goes backwards. The entry at index `i` has sequence
/// `first_seq() + i`, so a sequence number keeps naming the same logical
/// entry while older ones are evicted underneath it.
#[derive(Debug)]
pub struct WindowStore {
    entries: VecDeque<WindowEntry>,
    capacity: usize,
    written: u64,
}

impl WindowStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            written: 0,
        }
    }

    /// Store sized for a sliding window of `window_size` plotted entries.
    pub fn for_window(window_size: usize) -> Self {
        Self::new(window_size.saturating_mul(HISTORY_FACTOR))
    }

    /// Append an entry, evicting the oldest when full. Returns whether an
    /// eviction happened.
    pub fn push(&mut self, entry: WindowEntry) -> bool {
        let evicted = self.entries.len() == self.capacity;
        if evicted {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.written += 1;
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries ever appended.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Sequence number of the oldest retained entry.
    pub fn first_seq(&self) -> u64 {
        self.written - self.entries.len() as u64
    }

    /// Sequence number of the newest entry.
    pub fn last_seq(&self) -> Option<u64> {
        self.written.checked_sub(1).filter(|_| !self.is_empty())
    }

    pub fn get(&self, index: usize) -> Option<&WindowEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&WindowEntry> {
        self.entries.back()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    pub fn seq_of(&self, index: usize) -> Option<u64> {
        (index < self.entries.len()).then(|| self.first_seq() + index as u64)
    }

    /// Current index of a sequence number, `None` once evicted or if not
    /// yet written.
    pub fn index_of(&self, seq: u64) -> Option<usize> {
        let first = self.first_seq();
        if seq < first || seq >= self.written {
            return None;
        }
        Some((seq - first) as usize)
    }

    /// Index of the latest entry whose elapsed time is at or before `t`.
    pub fn latest_at_or_before(&self, t: f64) -> Option<usize> {
        self.entries
            .partition_point(|entry| entry.elapsed <= t)
            .checked_sub(1)
    }

    /// Index range of up to `window` entries ending at `end` (inclusive).
    /// `end` is clamped to the last index.
    pub fn window_range(&self, end: usize, window: usize) -> Range<usize> {
        let Some(last) = self.last_index() else {
            return 0..0;
        };
        let end = end.min(last);
        let start = (end + 1).saturating_sub(window.max(1));
        start..end + 1
    }

    pub fn range(&self, range: Range<usize>) -> impl Iterator<Item = &WindowEntry> {
        self.entries.range(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(t: f64) -> WindowEntry {
        WindowEntry::new(t, vec![t], format!("t={}", t))
    }

    fn filled(capacity: usize, count: usize) -> WindowStore {
        let mut store = WindowStore::new(capacity);
        for i in 0..count {
            store.push(entry(i as f64));
        }
        store
    }

    #[test]
    fn test_for_window_capacity() {
        assert_eq!(WindowStore::for_window(200).capacity(), 200_000);
        assert_eq!(WindowStore::for_window(0).capacity(), 1);
    }

    #[test]
    fn test_push_without_eviction() {
        let mut store = WindowStore::new(3);
        assert!(!store.push(entry(0.0)));
        assert!(!store.push(entry(1.0)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.first_seq(), 0);
        assert_eq!(store.last_seq(), Some(1));
    }

    #[test]
    fn test_eviction_drops_exactly_the_oldest() {
        let mut store = filled(3, 3);
        for i in 3..10 {
            assert!(store.push(entry(i as f64)));
            assert_eq!(store.len(), 3);
            assert_eq!(store.get(0).unwrap().elapsed, (i - 2) as f64);
        }
        assert_eq!(store.written(), 10);
        assert_eq!(store.first_seq(), 7);
    }

    #[test]
    fn test_seq_index_mapping_survives_eviction() {
        let mut store = filled(4, 4);
        let seq = store.seq_of(2).unwrap();
        assert_eq!(store.get(store.index_of(seq).unwrap()).unwrap().elapsed, 2.0);

        store.push(entry(4.0));
        assert_eq!(store.index_of(seq), Some(1));
        assert_eq!(store.get(1).unwrap().elapsed, 2.0);

        store.push(entry(5.0));
        store.push(entry(6.0));
        assert_eq!(store.index_of(seq), None);
        assert_eq!(store.index_of(store.written()), None);
    }

    #[test]
    fn test_empty_store() {
        let store = WindowStore::new(5);
        assert!(store.is_empty());
        assert_eq!(store.last_seq(), None);
        assert_eq!(store.last_index(), None);
        assert_eq!(store.latest_at_or_before(10.0), None);
        assert_eq!(store.window_range(3, 2), 0..0);
    }

    #[test]
    fn test_latest_at_or_before() {
        let mut store = WindowStore::new(10);
        for t in [0.1, 0.5, 1.2, 2.0] {
            store.push(entry(t));
        }
        assert_eq!(store.latest_at_or_before(0.0), None);
        assert_eq!(store.latest_at_or_before(0.5), Some(1));
        assert_eq!(store.latest_at_or_before(1.9), Some(2));
        assert_eq!(store.latest_at_or_before(99.0), Some(3));
    }

    #[test]
    fn test_window_range() {
        let store = filled(10, 6);
        assert_eq!(store.window_range(5, 3), 3..6);
        assert_eq!(store.window_range(1, 3), 0..2);
        assert_eq!(store.window_range(42, 2), 4..6);

        let raws: Vec<_> = store.range(store.window_range(2, 2)).map(|e| e.elapsed).collect();
        assert_eq!(raws, vec![1.0, 2.0]);
    }
}
