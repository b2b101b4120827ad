//! Bounded undo/redo history.
//!
//! Stores whole snapshots rather than inverse operations; boards are small
//! (tens of elements) so a snapshot per edit is cheap. The undo stack is capped
//! at `max_depth` entries, dropping the oldest first.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct History<T> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    max_depth: usize,
}

impl<T> History<T> {
    /// `max_depth == 0` disables history entirely.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::with_capacity(max_depth.min(64)),
            redo: Vec::new(),
            max_depth,
        }
    }

    /// Record the state as it was *before* a local edit.
    ///
    /// Any pending redo entries are discarded.
    pub fn record(&mut self, before: T) {
        self.redo.clear();
        if self.max_depth == 0 {
            return;
        }
        if self.undo.len() == self.max_depth {
            self.undo.pop_front();
        }
        self.undo.push_back(before);
    }

    /// Step back: returns the previous state, stashing `current` for redo.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop()?;
        if self.undo.len() == self.max_depth {
            self.undo.pop_front();
        }
        self.undo.push_back(current);
        Some(next)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo steps currently available.
    pub fn depth(&self) -> usize {
        self.undo.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_sequence() {
        let mut history = History::new(10);
        history.record(1);
        history.record(2);

        // Current state is 3.
        assert_eq!(history.undo(3), Some(2));
        assert_eq!(history.undo(2), Some(1));
        assert_eq!(history.undo(1), None);

        assert_eq!(history.redo(1), Some(2));
        assert_eq!(history.redo(2), Some(3));
        assert_eq!(history.redo(3), None);
    }

    #[test]
    fn test_depth_cap_drops_oldest() {
        let mut history = History::new(3);
        for i in 0..10 {
            history.record(i);
        }
        assert_eq!(history.depth(), 3);
        assert_eq!(history.undo(10), Some(9));
        assert_eq!(history.undo(9), Some(8));
        assert_eq!(history.undo(8), Some(7));
        assert_eq!(history.undo(7), None);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new(5);
        history.record(1);
        history.undo(2);
        assert!(history.can_redo());

        history.record(1);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_zero_depth_disables() {
        let mut history = History::new(0);
        history.record("a");
        assert!(!history.can_undo());
        assert_eq!(history.undo("b"), None);
    }

    #[test]
    fn test_clear() {
        let mut history = History::new(5);
        history.record(1);
        history.record(2);
        history.undo(3);
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
