//! Priority store for scheduled entries, ordered by expiration instant.
//!
//! [`DeadlineHeap`] is a plain data structure with no concurrency of its
//! own; the queue guards it with a mutex and the dispatcher is its only
//! structural owner. It is a classic binary heap keyed on `expire_at`
//! ascending: insert and pop are O(log n), peek is O(1).
//!
//! # Root-correct peek
//!
//! The dispatcher decides whether to abandon its current deadline wait by
//! comparing the held entry against `peek_earliest`. That comparison is only
//! sound if peek reports the true minimum. [`Scheduled`] reverses its key
//! comparison so that `BinaryHeap`'s max-root is the earliest deadline,
//! which makes `BinaryHeap::peek` (the structural root) the true minimum by
//! construction.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::time::Instant;

/// One scheduled entry: an expiration instant and the caller's payload.
///
/// Immutable once created; the payload passes through the queue unchanged.
pub(crate) struct Scheduled<T> {
    /// Absolute point in time at which the entry becomes due.
    pub(crate) expire_at: Instant,
    /// Caller-owned payload.
    pub(crate) value: T,
}

impl<T> Scheduled<T> {
    pub(crate) const fn new(expire_at: Instant, value: T) -> Self {
        Self { expire_at, value }
    }
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.expire_at == other.expire_at
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: the entry with the earliest deadline compares greatest,
        // so it sits at the root of the max-heap. Equal deadlines are
        // unordered relative to each other.
        other.expire_at.cmp(&self.expire_at)
    }
}

impl<T> fmt::Debug for Scheduled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduled")
            .field("expire_at", &self.expire_at)
            .finish_non_exhaustive()
    }
}

/// Min-heap of [`Scheduled`] entries, earliest deadline first.
pub(crate) struct DeadlineHeap<T> {
    entries: BinaryHeap<Scheduled<T>>,
}

impl<T> DeadlineHeap<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: BinaryHeap::new(),
        }
    }

    /// Inserts an entry. Always succeeds.
    pub(crate) fn insert(&mut self, expire_at: Instant, value: T) {
        self.entries.push(Scheduled::new(expire_at, value));
    }

    /// Removes and returns the entry with the earliest deadline.
    pub(crate) fn pop_earliest(&mut self) -> Option<Scheduled<T>> {
        self.entries.pop()
    }

    /// Returns the entry with the earliest deadline without removing it.
    pub(crate) fn peek_earliest(&self) -> Option<&Scheduled<T>> {
        self.entries.peek()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries without delivering them.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> fmt::Debug for DeadlineHeap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadlineHeap")
            .field("len", &self.entries.len())
            .field("next_deadline", &self.peek_earliest().map(|e| e.expire_at))
            .finish()
    }
}
