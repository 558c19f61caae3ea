//! Bounded most-recent-first event buffer

use std::collections::VecDeque;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Fixed-capacity buffer ordered by insertion, newest first.
///
/// Prepend and tail eviction happen under one write lock, so no reader ever
/// observes more than `capacity` items.
pub struct EventBuffer<T> {
    items: RwLock<VecDeque<T>>,
    capacity: usize,
}

impl<T: Clone> EventBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&self) -> RwLockReadGuard<'_, VecDeque<T>> {
        self.items.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<T>> {
        self.items.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert at the head, evicting the oldest items past capacity
    pub fn push(&self, item: T) {
        let mut items = self.write();
        if self.capacity == 0 {
            return;
        }
        items.push_front(item);
        items.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recently inserted item
    pub fn latest(&self) -> Option<T> {
        self.read().front().cloned()
    }

    /// Copy of the contents, newest first
    pub fn snapshot(&self) -> Vec<T> {
        self.read().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let buffer = EventBuffer::new(3);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);

        assert_eq!(buffer.snapshot(), vec![3, 2, 1]);
        assert_eq!(buffer.latest(), Some(3));
    }

    #[test]
    fn test_evicts_oldest() {
        let buffer = EventBuffer::new(3);
        for i in 0..50 {
            buffer.push(i);
            assert!(buffer.len() <= 3);
            assert_eq!(buffer.latest(), Some(i));
        }
        assert_eq!(buffer.snapshot(), vec![49, 48, 47]);
    }

    #[test]
    fn test_zero_capacity() {
        let buffer = EventBuffer::new(0);
        buffer.push("ignored");
        assert!(buffer.is_empty());
        assert_eq!(buffer.latest(), None);
    }

    #[test]
    fn test_clear() {
        let buffer = EventBuffer::new(2);
        buffer.push(1);
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_poisoned_lock_still_readable() {
        let buffer = std::sync::Arc::new(EventBuffer::new(3));
        buffer.push(1);

        let poisoner = buffer.clone();
        let result = std::thread::spawn(move || {
            let _guard = poisoner.items.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(buffer.items.is_poisoned());

        buffer.push(2);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.latest(), Some(2));
        assert_eq!(buffer.snapshot(), vec![2, 1]);

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
