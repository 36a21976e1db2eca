use std::collections::VecDeque;
use std::fmt;

/// Bounded FIFO keeping only the most recent `capacity` items, oldest first.
pub struct CircularQueue<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deque.fmt(f)
    }
}

impl<T> CircularQueue<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            deque: VecDeque::with_capacity(cap),
            capacity: cap.max(1),
        }
    }

    /// Appends `item`, returning the evicted oldest item when full.
    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.deque.pop_front()
        } else {
            None
        };

        self.deque.push_back(item);

        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn latest(&self) -> Option<&T> {
        self.deque.back()
    }

    /// The two most recent items as `(previous, current)`.
    #[inline]
    pub fn last_two(&self) -> Option<(&T, &T)> {
        let n = self.deque.len();
        if n < 2 {
            return None;
        }

        Some((&self.deque[n - 2], &self.deque[n - 1]))
    }

    #[inline]
    pub fn clear(&mut self) {
        self.deque.clear()
    }

    /// Iterates oldest to newest.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        self.deque.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut q = CircularQueue::with_capacity(2);

        assert_eq!(q.push(1), None);
        assert_eq!(q.push(2), None);
        assert_eq!(q.push(3), Some(1));
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn last_two_needs_two_items() {
        let mut q = CircularQueue::with_capacity(4);
        assert!(q.last_two().is_none());

        q.push('a');
        assert!(q.last_two().is_none());
        assert_eq!(q.latest(), Some(&'a'));

        q.push('b');
        q.push('c');
        assert_eq!(q.last_two(), Some((&'b', &'c')));
    }
}
