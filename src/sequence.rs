//! Sequence counters used to coordinate producers and consumers.
//!
//! A [`Sequence`] tracks progress through the ring buffer. Producers use one
//! as the claim cursor, consumers use one to report how far they have read,
//! and the sequencer folds the consumer sequences into a gating minimum.

use std::fmt;
use std::sync::atomic::{fence, AtomicI64, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use crate::INITIAL_CURSOR_VALUE;

/// A monotonic 64-bit sequence counter padded to its own cache line.
///
/// The padding is load-bearing: producer and consumer sequences are the
/// hottest words in the system, and without it two counters allocated next
/// to each other would ping-pong a shared cache line between cores.
pub struct Sequence {
    value: CachePadded<AtomicI64>,
}

impl Sequence {
    /// Create a new sequence with the given initial value.
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(initial_value)),
        }
    }

    /// Get the current value with acquire semantics.
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Set the value with release semantics.
    ///
    /// This is the ordered store used on every publish path: all writes made
    /// before `set` are visible to a thread that observes the new value.
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Set the value with a trailing store-load fence.
    ///
    /// Used where the writer must not have later loads reordered before the
    /// store, e.g. publishing claim intent before re-reading the gating
    /// minimum. A release store alone does not order the store against
    /// subsequent loads.
    #[inline]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::Release);
        fence(Ordering::SeqCst);
    }

    /// Atomically set the value to `new` if the current value is `expected`.
    ///
    /// Returns `true` if the swap happened.
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Atomically increment and return the new value.
    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Atomically add `increment` and return the new value.
    #[inline]
    pub fn add_and_get(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel) + increment
    }

    /// Fold the minimum value of `sequences`, starting from `minimum`.
    ///
    /// An empty slice returns `minimum` unchanged, which lets callers treat
    /// "no gating sequences yet" as "gated on my own cursor".
    pub fn get_minimum_sequence(sequences: &[Arc<Sequence>], minimum: i64) -> i64 {
        sequences
            .iter()
            .fold(minimum, |min, sequence| min.min(sequence.get()))
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence").field("value", &self.get()).finish()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}
