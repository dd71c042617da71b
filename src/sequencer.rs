//! Producer-side coordination: claiming, gating, and publishing sequences.
//!
//! A [`Sequencer`] hands out sequence numbers to producers, refuses to hand
//! out a slot that a consumer is still reading (gating), and records which
//! sequences have been published so barriers can ratify a contiguous prefix
//! for consumers. Two variants exist: [`SingleProducerSequencer`] relies on
//! there being exactly one claiming thread and keeps its claim state in
//! plain fields; [`MultiProducerSequencer`] claims through CAS and tracks
//! out-of-order publication with a per-slot availability flag.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use crate::sequence::Sequence;
use crate::wait_strategy::WaitStrategy;
use crate::{Result, RingBusError, INITIAL_CURSOR_VALUE};

/// Coordinator for claiming and publishing ring-buffer sequences.
pub trait Sequencer: Send + Sync + fmt::Debug {
    /// The cursor sequence: highest published (single producer) or highest
    /// claimed (multi producer).
    fn get_cursor(&self) -> Arc<Sequence>;

    /// Capacity of the ring this sequencer coordinates.
    fn get_buffer_size(&self) -> usize;

    /// Whether `required_capacity` further slots could be claimed right now.
    ///
    /// Concurrent by nature; treat the answer as an indication only.
    fn has_available_capacity(&self, required_capacity: i64) -> bool;

    /// Number of slots currently free.
    fn remaining_capacity(&self) -> i64;

    /// Claim the next sequence, blocking while the buffer is full.
    fn next(&self) -> i64 {
        self.next_n(1)
    }

    /// Claim the next `n` sequences, blocking while the buffer is full.
    /// Returns the highest claimed sequence.
    ///
    /// # Panics
    /// Panics if `n < 1` or `n` exceeds the buffer size.
    fn next_n(&self, n: i64) -> i64;

    /// Claim the next sequence without blocking.
    ///
    /// # Errors
    /// [`RingBusError::InsufficientCapacity`] when a claim would have to
    /// wait for consumers.
    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    /// Claim the next `n` sequences without blocking.
    ///
    /// # Errors
    /// [`RingBusError::InsufficientCapacity`] when a claim would have to
    /// wait for consumers.
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Force the claim position to `sequence`.
    ///
    /// Deliberately racy; only valid while no producer or consumer is
    /// running, e.g. to seed the ring during initialization.
    fn claim(&self, sequence: i64);

    /// Mark `sequence` as published and wake blocked consumers.
    fn publish(&self, sequence: i64);

    /// Mark the inclusive range `[low, high]` as published and wake blocked
    /// consumers once.
    fn publish_range(&self, low: i64, high: i64);

    /// Whether `sequence` has been published and is safe to read.
    fn is_available(&self, sequence: i64) -> bool;

    /// Highest sequence such that every sequence in
    /// `[next_sequence, result]` is published, bounded by
    /// `available_sequence`. Returns `next_sequence - 1` when the very first
    /// slot is still unpublished.
    ///
    /// This is the contiguity guarantee: consumers only ever see a gap-free
    /// prefix of published events.
    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64;

    /// Register consumer sequences the producer must not overrun.
    ///
    /// Each added sequence is seeded with the current cursor so a consumer
    /// registered mid-stream does not stall producers at `-1`.
    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]);

    /// Remove a gating sequence. Returns `true` if it was registered.
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;

    /// Minimum of the gating sequences and the cursor.
    fn get_minimum_sequence(&self) -> i64;

    /// The wait strategy consumers of this sequencer coordinate through.
    fn wait_strategy(&self) -> Arc<dyn WaitStrategy>;
}

/// Sequencer for exactly one producer thread.
///
/// `next_value` and `cached_gating_sequence` are plain (non-atomic) fields:
/// only the single producer ever touches them, so they need no
/// synchronization of their own. The cursor remains atomic because
/// consumers read it.
#[derive(Debug)]
pub struct SingleProducerSequencer {
    buffer_size: usize,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    gating_sequences: RwLock<Vec<Arc<Sequence>>>,
    next_value: Cell<i64>,
    cached_gating_sequence: Cell<i64>,
}

// SAFETY: the Cell fields are written only from claim-side methods, and the
// single-producer contract says exactly one thread calls those. Everything
// else on the struct is synchronized (atomics behind Arc, RwLock).
unsafe impl Sync for SingleProducerSequencer {}

impl SingleProducerSequencer {
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::default()),
            gating_sequences: RwLock::new(Vec::new()),
            next_value: Cell::new(INITIAL_CURSOR_VALUE),
            cached_gating_sequence: Cell::new(INITIAL_CURSOR_VALUE),
        }
    }

    fn has_capacity(&self, required_capacity: i64, do_store: bool) -> bool {
        let next_value = self.next_value.get();
        let wrap_point = (next_value + required_capacity) - self.buffer_size as i64;
        let cached_gating_sequence = self.cached_gating_sequence.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            if do_store {
                // Publish claim intent so consumers parked on the cursor see
                // how far the producer has progressed, and fence the store
                // against the gating re-read below.
                self.cursor.set_volatile(next_value);
            }

            let min_sequence =
                Sequence::get_minimum_sequence(&self.gating_sequences.read(), next_value);
            self.cached_gating_sequence.set(min_sequence);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl Sequencer for SingleProducerSequencer {
    fn get_cursor(&self) -> Arc<Sequence> {
        Arc::clone(&self.cursor)
    }

    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.has_capacity(required_capacity, false)
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.next_value.get();
        let consumed = Sequence::get_minimum_sequence(&self.gating_sequences.read(), produced);
        self.buffer_size as i64 - (produced - consumed)
    }

    fn next_n(&self, n: i64) -> i64 {
        assert!(
            n >= 1 && n <= self.buffer_size as i64,
            "claim of {n} slots outside 1..={}",
            self.buffer_size
        );

        let next_value = self.next_value.get();
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.buffer_size as i64;
        let cached_gating_sequence = self.cached_gating_sequence.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            self.cursor.set_volatile(next_value);

            let mut min_sequence =
                Sequence::get_minimum_sequence(&self.gating_sequences.read(), next_value);
            while wrap_point > min_sequence {
                thread::park_timeout(Duration::from_nanos(1));
                min_sequence =
                    Sequence::get_minimum_sequence(&self.gating_sequences.read(), next_value);
            }
            self.cached_gating_sequence.set(min_sequence);
        }

        self.next_value.set(next_sequence);
        next_sequence
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        assert!(n >= 1, "claim of {n} slots");

        if !self.has_capacity(n, true) {
            return Err(RingBusError::InsufficientCapacity);
        }

        let next_sequence = self.next_value.get() + n;
        self.next_value.set(next_sequence);
        Ok(next_sequence)
    }

    fn claim(&self, sequence: i64) {
        self.next_value.set(sequence);
    }

    fn publish(&self, sequence: i64) {
        self.cursor.set(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, _low: i64, high: i64) {
        // With one producer the cursor is the availability record; the range
        // commits as a single cursor advance.
        self.publish(high);
    }

    fn is_available(&self, sequence: i64) -> bool {
        sequence <= self.cursor.get()
    }

    fn get_highest_published_sequence(&self, _next_sequence: i64, available_sequence: i64) -> i64 {
        // Publication is in claim order, so contiguity is automatic.
        available_sequence
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        let mut sequences = self.gating_sequences.write();
        let cursor = self.cursor.get();
        for sequence in gating_sequences {
            sequence.set(cursor);
            sequences.push(Arc::clone(sequence));
        }
        debug!(total = sequences.len(), cursor, "added gating sequences");
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        let mut sequences = self.gating_sequences.write();
        if let Some(position) = sequences.iter().position(|s| Arc::ptr_eq(s, sequence)) {
            sequences.remove(position);
            debug!(total = sequences.len(), "removed gating sequence");
            true
        } else {
            false
        }
    }

    fn get_minimum_sequence(&self) -> i64 {
        Sequence::get_minimum_sequence(&self.gating_sequences.read(), self.cursor.get())
    }

    fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        Arc::clone(&self.wait_strategy)
    }
}

/// Sequencer for concurrent producers.
///
/// Claims advance the shared cursor through CAS, so the cursor alone cannot
/// say which sequences are written: producer B may finish slot 8 before
/// producer A finishes slot 7. Each slot therefore carries an availability
/// flag holding the wrap generation (`sequence >> log2(buffer_size)`) of its
/// most recent publication; a slot is readable exactly when its flag matches
/// the generation of the queried sequence.
#[derive(Debug)]
pub struct MultiProducerSequencer {
    buffer_size: usize,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    gating_sequences: RwLock<Vec<Arc<Sequence>>>,
    gating_sequence_cache: Sequence,
    available_buffer: Box<[AtomicI32]>,
    index_mask: i64,
    index_shift: u32,
}

impl MultiProducerSequencer {
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        assert!(
            buffer_size >= 1 && buffer_size.is_power_of_two(),
            "buffer size must be a power of two, got {buffer_size}"
        );

        // -1 matches no generation of any published sequence, so every slot
        // starts unavailable (including slot 0 at sequence 0, generation 0).
        let available_buffer: Box<[AtomicI32]> =
            (0..buffer_size).map(|_| AtomicI32::new(-1)).collect();

        Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::default()),
            gating_sequences: RwLock::new(Vec::new()),
            gating_sequence_cache: Sequence::default(),
            available_buffer,
            index_mask: (buffer_size - 1) as i64,
            index_shift: buffer_size.trailing_zeros(),
        }
    }

    #[inline]
    fn calculate_index(&self, sequence: i64) -> usize {
        (sequence & self.index_mask) as usize
    }

    #[inline]
    fn calculate_availability_flag(&self, sequence: i64) -> i32 {
        (sequence >> self.index_shift) as i32
    }

    fn set_available(&self, sequence: i64) {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].store(flag, Ordering::Release);
    }

    fn has_capacity_from(&self, required_capacity: i64, cursor_value: i64) -> bool {
        let wrap_point = (cursor_value + required_capacity) - self.buffer_size as i64;
        let cached_gating_sequence = self.gating_sequence_cache.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > cursor_value {
            let min_sequence =
                Sequence::get_minimum_sequence(&self.gating_sequences.read(), cursor_value);
            self.gating_sequence_cache.set(min_sequence);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl Sequencer for MultiProducerSequencer {
    fn get_cursor(&self) -> Arc<Sequence> {
        Arc::clone(&self.cursor)
    }

    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.has_capacity_from(required_capacity, self.cursor.get())
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.cursor.get();
        let consumed = Sequence::get_minimum_sequence(&self.gating_sequences.read(), produced);
        self.buffer_size as i64 - (produced - consumed)
    }

    fn next_n(&self, n: i64) -> i64 {
        assert!(
            n >= 1 && n <= self.buffer_size as i64,
            "claim of {n} slots outside 1..={}",
            self.buffer_size
        );

        loop {
            let current = self.cursor.get();
            let next = current + n;
            let wrap_point = next - self.buffer_size as i64;
            let cached_gating_sequence = self.gating_sequence_cache.get();

            if wrap_point > cached_gating_sequence || cached_gating_sequence > current {
                let gating_sequence =
                    Sequence::get_minimum_sequence(&self.gating_sequences.read(), current);

                if wrap_point > gating_sequence {
                    self.wait_strategy.signal_all_when_blocking();
                    thread::park_timeout(Duration::from_nanos(1));
                    continue;
                }

                self.gating_sequence_cache.set(gating_sequence);
            } else if self.cursor.compare_and_set(current, next) {
                return next;
            }
        }
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        assert!(n >= 1, "claim of {n} slots");

        loop {
            let current = self.cursor.get();
            let next = current + n;

            if !self.has_capacity_from(n, current) {
                return Err(RingBusError::InsufficientCapacity);
            }

            if self.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn claim(&self, sequence: i64) {
        self.cursor.set(sequence);
    }

    fn publish(&self, sequence: i64) {
        self.set_available(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, low: i64, high: i64) {
        for sequence in low..=high {
            self.set_available(sequence);
        }
        self.wait_strategy.signal_all_when_blocking();
    }

    fn is_available(&self, sequence: i64) -> bool {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].load(Ordering::Acquire) == flag
    }

    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64 {
        let mut sequence = next_sequence;
        while sequence <= available_sequence {
            if !self.is_available(sequence) {
                return sequence - 1;
            }
            sequence += 1;
        }
        available_sequence
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        let mut sequences = self.gating_sequences.write();
        let cursor = self.cursor.get();
        for sequence in gating_sequences {
            sequence.set(cursor);
            sequences.push(Arc::clone(sequence));
        }
        debug!(total = sequences.len(), cursor, "added gating sequences");
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        let mut sequences = self.gating_sequences.write();
        if let Some(position) = sequences.iter().position(|s| Arc::ptr_eq(s, sequence)) {
            sequences.remove(position);
            debug!(total = sequences.len(), "removed gating sequence");
            true
        } else {
            false
        }
    }

    fn get_minimum_sequence(&self) -> i64 {
        Sequence::get_minimum_sequence(&self.gating_sequences.read(), self.cursor.get())
    }

    fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        Arc::clone(&self.wait_strategy)
    }
}
