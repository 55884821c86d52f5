// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Implementation of a ring buffer over a caller-provided slice.

use crate::collections::queue::Queue;

/// A FIFO over a borrowed slice.
///
/// One slot is kept free to tell a full buffer from an empty one, so a
/// backing slice of length `n` holds at most `n - 1` elements.
pub struct RingBuffer<'a, T: 'a> {
    ring: &'a mut [T],
    head: usize,
    tail: usize,
}

impl<'a, T: Copy> RingBuffer<'a, T> {
    pub fn new(ring: &'a mut [T]) -> RingBuffer<'a, T> {
        RingBuffer {
            ring,
            head: 0,
            tail: 0,
        }
    }

    /// Number of elements that can still be enqueued.
    pub fn available_len(&self) -> usize {
        self.ring.len().saturating_sub(1 + self.len())
    }

    /// Look at the front element without removing it.
    pub fn peek(&self) -> Option<T> {
        if self.has_elements() {
            Some(self.ring[self.head])
        } else {
            None
        }
    }

    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.ring.len()
    }
}

impl<T: Copy> Queue<T> for RingBuffer<'_, T> {
    fn has_elements(&self) -> bool {
        self.head != self.tail
    }

    fn is_full(&self) -> bool {
        self.ring.len() == 0 || self.head == self.advance(self.tail)
    }

    fn len(&self) -> usize {
        if self.tail >= self.head {
            self.tail - self.head
        } else {
            (self.ring.len() - self.head) + self.tail
        }
    }

    fn enqueue(&mut self, val: T) -> bool {
        if self.is_full() {
            false
        } else {
            self.ring[self.tail] = val;
            self.tail = self.advance(self.tail);
            true
        }
    }

    fn dequeue(&mut self) -> Option<T> {
        let val = self.peek()?;
        self.head = self.advance(self.head);
        Some(val)
    }
}
