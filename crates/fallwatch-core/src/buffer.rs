//! Fixed-capacity ring buffer of raw samples.
//!
//! Holds the most recent `capacity` samples in arrival order. Once full, each
//! push evicts the oldest sample.

use std::collections::VecDeque;

use crate::domain::{RawSample, BUFFER_SIZE};

#[derive(Debug, Clone)]
pub struct SlidingWindowBuffer {
    samples: VecDeque<RawSample>,
    capacity: usize,
}

impl SlidingWindowBuffer {
    /// Capacity is clamped to at least one sample.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, sample: RawSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Chronological view of the current contents, oldest first.
    ///
    /// The fall pipeline only calls this once `is_full()` holds.
    pub fn snapshot(&self) -> Window<'_> {
        let (head, tail) = self.samples.as_slices();
        Window { head, tail }
    }
}

impl Default for SlidingWindowBuffer {
    fn default() -> Self {
        Self::with_capacity(BUFFER_SIZE)
    }
}

/// Read-only window of samples in chronological order.
///
/// Borrowed from a [`SlidingWindowBuffer`] (whose storage may wrap, hence two
/// slices) or from a plain slice of rows.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    head: &'a [RawSample],
    tail: &'a [RawSample],
}

impl<'a> Window<'a> {
    pub fn from_rows(rows: &'a [RawSample]) -> Self {
        Self { head: rows, tail: &[] }
    }

    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a RawSample> + 'a {
        self.head.iter().chain(self.tail.iter())
    }
}
