//! Live/Paused view state over the window store.

use super::store::WindowStore;

/// Live or Paused, plus the entry a paused view is pinned to.
///
/// The pin is an absolute sequence number from [`WindowStore`], so it keeps
/// naming the same logical entry while new samples arrive. Once eviction
/// passes it, it is clamped to the oldest retained entry.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ViewState {
    paused: bool,
    pinned: Option<u64>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pinned(&self) -> Option<u64> {
        self.pinned
    }

    /// Index of the displayed entry, `None` when tracking the latest.
    pub fn cursor(&self, store: &WindowStore) -> Option<usize> {
        let seq = self.pinned?;
        let last = store.last_index()?;
        let index = seq.saturating_sub(store.first_seq()) as usize;
        Some(index.min(last))
    }

    /// Toggle between Live and Paused; returns whether the view is now paused.
    pub fn toggle(&mut self, store: &WindowStore) -> bool {
        if self.paused {
            self.resume();
        } else {
            self.pause(store);
        }
        self.paused
    }

    /// Freeze on the newest entry.
    pub fn pause(&mut self, store: &WindowStore) {
        self.paused = true;
        self.pinned = store.last_seq();
    }

    pub fn resume(&mut self) {
        self.paused = false;
        self.pinned = None;
    }

    /// Re-establish the cursor invariant after the store changed.
    pub fn clamp(&mut self, store: &WindowStore) {
        if !self.paused {
            self.pinned = None;
            return;
        }
        match (self.pinned, store.last_seq()) {
            (_, None) => self.pinned = None,
            // Paused before anything arrived: pin to the first entry seen
            (None, Some(last)) => self.pinned = Some(last),
            (Some(seq), Some(last)) => self.pinned = Some(seq.clamp(store.first_seq(), last)),
        }
    }

    /// Move the pin to the latest entry at or before `seconds` earlier.
    /// Returns `false` when not applicable (live or empty store).
    pub fn step_back(&mut self, store: &WindowStore, seconds: f64) -> bool {
        let Some(current) = self.paused_cursor(store) else {
            return false;
        };
        let Some(entry) = store.get(current) else {
            return false;
        };

        let target = store.latest_at_or_before(entry.elapsed - seconds).unwrap_or(0);
        self.pinned = store.seq_of(target);
        true
    }

    /// Move the pin to the latest entry at or before `seconds` later,
    /// advancing at least one entry unless already at the newest.
    pub fn step_forward(&mut self, store: &WindowStore, seconds: f64) -> bool {
        let Some(current) = self.paused_cursor(store) else {
            return false;
        };
        let (Some(entry), Some(last)) = (store.get(current), store.last_index()) else {
            return false;
        };

        let mut target = store
            .latest_at_or_before(entry.elapsed + seconds)
            .unwrap_or(current)
            .min(last);
        if target <= current && current < last {
            target = current + 1;
        }
        self.pinned = store.seq_of(target);
        true
    }

    fn paused_cursor(&mut self, store: &WindowStore) -> Option<usize> {
        if !self.paused || store.is_empty() {
            return None;
        }
        self.clamp(store);
        self.cursor(store)
    }
}
