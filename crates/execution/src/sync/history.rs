//! Bounded event histories.

use std::collections::VecDeque;

/// Append-only history that drops its oldest entries past a maximum length.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    max_len: usize,
}

impl<T: Clone> BoundedHistory<T> {
    /// Creates an empty history holding at most `max_len` entries.
    pub fn new(max_len: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(max_len.min(1024)),
            max_len,
        }
    }

    /// Appends `entries` in order, then trims from the front.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = T>) {
        self.items.extend(entries);
        if self.items.len() > self.max_len {
            let excess = self.items.len() - self.max_len;
            self.items.drain(..excess);
        }
    }

    /// Appends one entry.
    pub fn push(&mut self, entry: T) {
        self.extend(std::iter::once(entry));
    }

    /// Copies of the `limit` most recent entries, oldest first.
    pub fn tail(&self, limit: usize) -> Vec<T> {
        let skip = self.items.len().saturating_sub(limit);
        self.items.iter().skip(skip).cloned().collect()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_to_max_keeping_newest_in_order() {
        let mut history = BoundedHistory::new(5);
        history.extend(0..3);
        assert_eq!(history.len(), 3);

        history.extend(3..12);
        assert_eq!(history.len(), 5);
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![7, 8, 9, 10, 11]);

        history.push(12);
        assert_eq!(history.len(), 5);
        assert_eq!(history.last(), Some(&12));
    }

    #[test]
    fn test_tail_is_bounded_and_ordered() {
        let mut history = BoundedHistory::new(10);
        history.extend(0..6);
        assert_eq!(history.tail(3), vec![3, 4, 5]);
        assert_eq!(history.tail(100), vec![0, 1, 2, 3, 4, 5]);
        assert!(history.tail(0).is_empty());
    }
}
