//! # FIFO Queue
//!
//! Enqueue at the back, dequeue at the front. Dequeued slots become front
//! spare; when the back runs out the live elements slide down to reuse it
//! before the queue grows.

use std::fmt;

use super::element_buffer::ElementBuffer;
use crate::config::AllocStrategy;

/// First-in first-out queue.
pub struct Queue<T> {
    buffer: ElementBuffer<T>,
    strategy: AllocStrategy,
}

impl<T> Queue<T> {
    /// Creates an empty queue with the default growth strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_strategy(AllocStrategy::default())
    }

    /// Creates an empty queue growing by the given strategy.
    #[must_use]
    pub fn with_strategy(strategy: AllocStrategy) -> Self {
        Self {
            buffer: ElementBuffer::new(),
            strategy,
        }
    }

    /// Replaces the growth bounds.
    pub fn set_alloc_strategy(&mut self, min_grow: usize, max_grow: usize) {
        self.strategy = AllocStrategy::new(min_grow, max_grow);
    }

    /// Disables growth, raising the capacity to `capacity` if needed.
    pub fn set_fixed_capacity(&mut self, capacity: usize) {
        self.strategy = AllocStrategy::fixed();
        if capacity > self.buffer.capacity() {
            self.adjust_capacity(capacity);
        }
    }

    /// Current growth strategy.
    #[inline]
    #[must_use]
    pub fn alloc_strategy(&self) -> AllocStrategy {
        self.strategy
    }

    /// Number of queued elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Allocated slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Slots freed by dequeues and not yet reused.
    #[inline]
    #[must_use]
    pub fn spare_dequeue(&self) -> usize {
        self.buffer.front_spare()
    }

    /// Elements that can be enqueued before the queue must compact or grow.
    #[inline]
    #[must_use]
    pub fn spare_enqueue(&self) -> usize {
        self.buffer.back_spare()
    }

    /// Makes room for `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        let wanted = self.len() + additional;
        if wanted > self.capacity() {
            self.adjust_capacity(wanted);
        }
    }

    /// Drops every element, keeping the capacity.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Appends an element.
    pub fn enqueue(&mut self, value: T) {
        self.check_enqueue();
        self.buffer.push_back(value);
    }

    /// Constructs an element at the back of the queue.
    pub fn emplace(&mut self, make: impl FnOnce() -> T) -> &mut T {
        self.check_enqueue();
        self.buffer.emplace_back(make)
    }

    /// Removes and returns the oldest element.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn dequeue(&mut self) -> T {
        self.buffer.pop_front()
    }

    /// Removes the oldest element, or returns None when empty.
    pub fn try_dequeue(&mut self) -> Option<T> {
        if self.is_empty() {
            None
        } else {
            Some(self.buffer.pop_front())
        }
    }

    /// Oldest element.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    #[must_use]
    pub fn front(&self) -> &T {
        self.buffer.front()
    }

    /// Newest element.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    #[must_use]
    pub fn back(&self) -> &T {
        self.buffer.back()
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.buffer.as_slice().iter()
    }

    fn check_enqueue(&mut self) {
        if self.buffer.is_empty() {
            self.buffer.move_to_front();
        }
        if self.buffer.back_spare() == 0 {
            if self.buffer.front_spare() > 0 {
                self.buffer.move_to_front();
            } else {
                self.grow();
            }
        }
    }

    fn adjust_capacity(&mut self, capacity: usize) {
        tracing::trace!("queue realloc: {} -> {} slots", self.capacity(), capacity);
        self.buffer.alloc(capacity, 0);
    }

    fn grow(&mut self) {
        let capacity = self.capacity();
        let grow_by = self.strategy.grow_by(capacity);
        assert!(grow_by > 0, "Queue: fixed capacity {capacity} exceeded");
        self.adjust_capacity(capacity + grow_by);
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            strategy: self.strategy,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
