//! The ring buffer: pre-allocated slots addressed by sequence.
//!
//! Storage is a fixed array of `buffer_size` events created once at
//! construction; a sequence `s` maps to slot `s & (buffer_size - 1)`, so a
//! slot is reused every `buffer_size` sequences. All coordination — who may
//! write a slot, when it becomes readable, when it may be reused — is
//! delegated to the [`Sequencer`].

use std::cell::UnsafeCell;
use std::fmt;
use std::hint;
use std::sync::Arc;

use tracing::debug;

use crate::event_factory::EventFactory;
use crate::event_translator::{
    EventTranslator, EventTranslatorOneArg, EventTranslatorThreeArg, EventTranslatorTwoArg,
    EventTranslatorVararg,
};
use crate::producer_type::ProducerType;
use crate::sequence::Sequence;
use crate::sequence_barrier::SequenceBarrier;
use crate::sequencer::Sequencer;
use crate::wait_strategy::WaitStrategy;
use crate::{Result, RingBusError};

/// Fixed-size exchange of pre-allocated event slots.
pub struct RingBuffer<E> {
    slots: Box<[UnsafeCell<E>]>,
    index_mask: i64,
    sequencer: Arc<dyn Sequencer>,
}

// SAFETY: slot access is coordinated entirely through the sequencer. A slot
// is mutated only by the producer that claimed its sequence and read only
// after publication, with the release/acquire edge on the cursor or
// availability flag ordering those accesses.
unsafe impl<E: Send + Sync> Send for RingBuffer<E> {}
unsafe impl<E: Send + Sync> Sync for RingBuffer<E> {}

impl<E> RingBuffer<E>
where
    E: Send + Sync,
{
    /// Create a ring buffer with the sequencer variant chosen by
    /// `producer_type`.
    ///
    /// # Errors
    /// [`RingBusError::InvalidBufferSize`] if `buffer_size` is zero or not
    /// a power of two.
    pub fn new<F>(
        producer_type: ProducerType,
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<E>,
    {
        if buffer_size == 0 || !buffer_size.is_power_of_two() {
            return Err(RingBusError::InvalidBufferSize(buffer_size));
        }

        let slots: Box<[UnsafeCell<E>]> = (0..buffer_size)
            .map(|_| UnsafeCell::new(event_factory.new_instance()))
            .collect();

        debug!(buffer_size, %producer_type, "ring buffer created");

        Ok(Self {
            slots,
            index_mask: (buffer_size - 1) as i64,
            sequencer: producer_type.new_sequencer(buffer_size, wait_strategy),
        })
    }

    /// Create a ring buffer for a single producer thread.
    ///
    /// # Errors
    /// [`RingBusError::InvalidBufferSize`] if `buffer_size` is zero or not
    /// a power of two.
    pub fn create_single_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<E>,
    {
        Self::new(
            ProducerType::Single,
            event_factory,
            buffer_size,
            wait_strategy,
        )
    }

    /// Create a ring buffer safe for concurrent producers.
    ///
    /// # Errors
    /// [`RingBusError::InvalidBufferSize`] if `buffer_size` is zero or not
    /// a power of two.
    pub fn create_multi_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<E>,
    {
        Self::new(
            ProducerType::Multi,
            event_factory,
            buffer_size,
            wait_strategy,
        )
    }

    /// The pre-allocated event for `sequence`.
    ///
    /// Sequences `s` and `s + buffer_size` alias the same slot. Reading a
    /// slot whose sequence has not been ratified by a barrier (or
    /// [`is_published`](Self::is_published)) sees whatever the previous
    /// occupant left behind.
    #[inline]
    pub fn get(&self, sequence: i64) -> &E {
        let index = (sequence & self.index_mask) as usize;
        // SAFETY: the mask keeps the index in bounds for any sequence.
        unsafe { &*self.slots.get_unchecked(index).get() }
    }

    /// Mutable handle to the slot for a claimed sequence.
    ///
    /// # Safety
    /// The caller must hold the claim on `sequence` (obtained from
    /// [`next`](Self::next) or [`try_next`](Self::try_next)) and must not
    /// have published it yet. The claim protocol guarantees no other thread
    /// touches the slot in that window.
    #[inline]
    pub unsafe fn get_mut(&self, sequence: i64) -> &mut E {
        let index = (sequence & self.index_mask) as usize;
        &mut *self.slots.get_unchecked(index).get()
    }

    /// The event for `sequence`, busy-waiting until it has been published.
    ///
    /// Rarely what a consumer wants — a [`SequenceBarrier`] waits with a
    /// pluggable strategy and batches — but useful for spot reads.
    pub fn get_published(&self, sequence: i64) -> &E {
        while !self.sequencer.is_available(sequence) {
            hint::spin_loop();
        }
        self.get(sequence)
    }

    /// Claim the next sequence, blocking while the buffer is full.
    ///
    /// Pair every claim with a [`publish`](Self::publish); an unpublished
    /// claim stalls all consumers.
    pub fn next(&self) -> i64 {
        self.sequencer.next()
    }

    /// Claim the next `n` sequences, blocking while the buffer is full.
    /// Returns the highest claimed sequence.
    pub fn next_n(&self, n: i64) -> i64 {
        self.sequencer.next_n(n)
    }

    /// Claim the next sequence without blocking.
    ///
    /// # Errors
    /// [`RingBusError::InsufficientCapacity`] when the buffer is full.
    pub fn try_next(&self) -> Result<i64> {
        self.sequencer.try_next()
    }

    /// Claim the next `n` sequences without blocking.
    ///
    /// # Errors
    /// [`RingBusError::InsufficientCapacity`] when the buffer cannot hold
    /// `n` more events.
    pub fn try_next_n(&self, n: i64) -> Result<i64> {
        self.sequencer.try_next_n(n)
    }

    /// Make `sequence` visible to consumers and wake blocked waiters.
    pub fn publish(&self, sequence: i64) {
        self.sequencer.publish(sequence);
    }

    /// Make the inclusive range `[low, high]` visible to consumers.
    pub fn publish_range(&self, low: i64, high: i64) {
        self.sequencer.publish_range(low, high);
    }

    /// Whether `sequence` has been published.
    pub fn is_published(&self, sequence: i64) -> bool {
        self.sequencer.is_available(sequence)
    }

    /// Register consumer sequences that gate slot reuse.
    pub fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.sequencer.add_gating_sequences(gating_sequences);
    }

    /// Remove a gating sequence. Returns `true` if it was registered.
    ///
    /// Producers blocked on the removed sequence observe the new, higher
    /// minimum on their next gating check.
    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.sequencer.remove_gating_sequence(sequence)
    }

    /// Create a barrier gated on `sequences_to_track`; an empty slice
    /// yields a barrier on the publish cursor alone.
    pub fn new_barrier(&self, sequences_to_track: &[Arc<Sequence>]) -> SequenceBarrier {
        SequenceBarrier::new(Arc::clone(&self.sequencer), sequences_to_track.to_vec())
    }

    /// Current cursor value.
    pub fn get_cursor(&self) -> i64 {
        self.sequencer.get_cursor().get()
    }

    /// Capacity of the buffer.
    pub fn get_buffer_size(&self) -> usize {
        self.slots.len()
    }

    /// Whether `required_capacity` further slots could be claimed right now.
    pub fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.sequencer.has_available_capacity(required_capacity)
    }

    /// Number of slots currently free.
    pub fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    /// Minimum of the gating sequences and the cursor.
    pub fn get_minimum_gating_sequence(&self) -> i64 {
        self.sequencer.get_minimum_sequence()
    }

    /// Reset the cursor to `sequence` and publish it.
    ///
    /// Deliberately racy: only valid before any producer or consumer has
    /// started and before gating sequences are registered.
    pub fn reset_to(&self, sequence: i64) {
        debug!(sequence, "resetting ring buffer cursor");
        self.sequencer.claim(sequence);
        self.sequencer.publish(sequence);
    }

    /// Force-claim `sequence` and return its slot for seeding.
    ///
    /// # Safety
    /// Same contract as [`get_mut`](Self::get_mut), plus the racy-reset
    /// caveat of [`reset_to`](Self::reset_to): no producer or consumer may
    /// be running.
    pub unsafe fn claim_and_get_preallocated(&self, sequence: i64) -> &mut E {
        self.sequencer.claim(sequence);
        self.get_mut(sequence)
    }

    /// Claim one sequence, run `translator` on its slot, and publish.
    ///
    /// Publication happens on every exit path: if the translator panics the
    /// sequence is still published before the panic resumes, because an
    /// unpublished claim would stall the ring forever. Consumers may then
    /// observe a partially-filled event and are expected to validate.
    pub fn publish_event<T>(&self, translator: &T)
    where
        T: EventTranslator<E>,
    {
        let sequence = self.sequencer.next();
        let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
        // SAFETY: `sequence` was claimed above and is not yet published.
        let event = unsafe { self.get_mut(sequence) };
        translator.translate_to(event, sequence);
    }

    /// Non-blocking [`publish_event`](Self::publish_event); returns `false`
    /// when the buffer is full.
    pub fn try_publish_event<T>(&self, translator: &T) -> bool
    where
        T: EventTranslator<E>,
    {
        match self.sequencer.try_next() {
            Ok(sequence) => {
                let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
                // SAFETY: `sequence` was claimed above and is not yet published.
                let event = unsafe { self.get_mut(sequence) };
                translator.translate_to(event, sequence);
                true
            }
            Err(_) => false,
        }
    }

    /// One-argument form of [`publish_event`](Self::publish_event).
    pub fn publish_event_one_arg<T, A>(&self, translator: &T, arg0: A)
    where
        T: EventTranslatorOneArg<E, A>,
    {
        let sequence = self.sequencer.next();
        let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
        // SAFETY: `sequence` was claimed above and is not yet published.
        let event = unsafe { self.get_mut(sequence) };
        translator.translate_to(event, sequence, arg0);
    }

    /// One-argument form of [`try_publish_event`](Self::try_publish_event).
    pub fn try_publish_event_one_arg<T, A>(&self, translator: &T, arg0: A) -> bool
    where
        T: EventTranslatorOneArg<E, A>,
    {
        match self.sequencer.try_next() {
            Ok(sequence) => {
                let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
                // SAFETY: `sequence` was claimed above and is not yet published.
                let event = unsafe { self.get_mut(sequence) };
                translator.translate_to(event, sequence, arg0);
                true
            }
            Err(_) => false,
        }
    }

    /// Two-argument form of [`publish_event`](Self::publish_event).
    pub fn publish_event_two_arg<T, A, B>(&self, translator: &T, arg0: A, arg1: B)
    where
        T: EventTranslatorTwoArg<E, A, B>,
    {
        let sequence = self.sequencer.next();
        let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
        // SAFETY: `sequence` was claimed above and is not yet published.
        let event = unsafe { self.get_mut(sequence) };
        translator.translate_to(event, sequence, arg0, arg1);
    }

    /// Two-argument form of [`try_publish_event`](Self::try_publish_event).
    pub fn try_publish_event_two_arg<T, A, B>(&self, translator: &T, arg0: A, arg1: B) -> bool
    where
        T: EventTranslatorTwoArg<E, A, B>,
    {
        match self.sequencer.try_next() {
            Ok(sequence) => {
                let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
                // SAFETY: `sequence` was claimed above and is not yet published.
                let event = unsafe { self.get_mut(sequence) };
                translator.translate_to(event, sequence, arg0, arg1);
                true
            }
            Err(_) => false,
        }
    }

    /// Three-argument form of [`publish_event`](Self::publish_event).
    pub fn publish_event_three_arg<T, A, B, C>(&self, translator: &T, arg0: A, arg1: B, arg2: C)
    where
        T: EventTranslatorThreeArg<E, A, B, C>,
    {
        let sequence = self.sequencer.next();
        let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
        // SAFETY: `sequence` was claimed above and is not yet published.
        let event = unsafe { self.get_mut(sequence) };
        translator.translate_to(event, sequence, arg0, arg1, arg2);
    }

    /// Three-argument form of [`try_publish_event`](Self::try_publish_event).
    pub fn try_publish_event_three_arg<T, A, B, C>(
        &self,
        translator: &T,
        arg0: A,
        arg1: B,
        arg2: C,
    ) -> bool
    where
        T: EventTranslatorThreeArg<E, A, B, C>,
    {
        match self.sequencer.try_next() {
            Ok(sequence) => {
                let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
                // SAFETY: `sequence` was claimed above and is not yet published.
                let event = unsafe { self.get_mut(sequence) };
                translator.translate_to(event, sequence, arg0, arg1, arg2);
                true
            }
            Err(_) => false,
        }
    }

    /// Variadic form of [`publish_event`](Self::publish_event): the
    /// translator receives `args` as a slice.
    pub fn publish_event_args<T, A>(&self, translator: &T, args: &[A])
    where
        T: EventTranslatorVararg<E, A>,
    {
        let sequence = self.sequencer.next();
        let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
        // SAFETY: `sequence` was claimed above and is not yet published.
        let event = unsafe { self.get_mut(sequence) };
        translator.translate_to(event, sequence, args);
    }

    /// Variadic form of [`try_publish_event`](Self::try_publish_event).
    pub fn try_publish_event_args<T, A>(&self, translator: &T, args: &[A]) -> bool
    where
        T: EventTranslatorVararg<E, A>,
    {
        match self.sequencer.try_next() {
            Ok(sequence) => {
                let _publish = PendingPublish::single(self.sequencer.as_ref(), sequence);
                // SAFETY: `sequence` was claimed above and is not yet published.
                let event = unsafe { self.get_mut(sequence) };
                translator.translate_to(event, sequence, args);
                true
            }
            Err(_) => false,
        }
    }

    /// Publish one event per translator as a single batch: one claim of
    /// `translators.len()` slots, one range publication after filling.
    ///
    /// The same publish-on-every-exit-path guarantee applies to the whole
    /// claimed range.
    pub fn publish_events<T>(&self, translators: &[T])
    where
        T: EventTranslator<E>,
    {
        if translators.is_empty() {
            return;
        }

        let n = translators.len() as i64;
        let high = self.sequencer.next_n(n);
        let low = high - (n - 1);

        let _publish = PendingPublish::range(self.sequencer.as_ref(), low, high);
        for (offset, translator) in translators.iter().enumerate() {
            let sequence = low + offset as i64;
            // SAFETY: the range [low, high] was claimed above and is not
            // yet published.
            let event = unsafe { self.get_mut(sequence) };
            translator.translate_to(event, sequence);
        }
    }

    /// Non-blocking [`publish_events`](Self::publish_events).
    ///
    /// Returns `false` without claiming anything when the batch exceeds the
    /// buffer size or the buffer cannot currently hold it.
    pub fn try_publish_events<T>(&self, translators: &[T]) -> bool
    where
        T: EventTranslator<E>,
    {
        if translators.is_empty() {
            return true;
        }

        let n = translators.len() as i64;
        if n > self.slots.len() as i64 {
            return false;
        }

        match self.sequencer.try_next_n(n) {
            Ok(high) => {
                let low = high - (n - 1);
                let _publish = PendingPublish::range(self.sequencer.as_ref(), low, high);
                for (offset, translator) in translators.iter().enumerate() {
                    let sequence = low + offset as i64;
                    // SAFETY: the range [low, high] was claimed above and is
                    // not yet published.
                    let event = unsafe { self.get_mut(sequence) };
                    translator.translate_to(event, sequence);
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Publish one event per argument as a single batch through a shared
    /// one-arg translator.
    pub fn publish_events_one_arg<T, A>(&self, translator: &T, args: Vec<A>)
    where
        T: EventTranslatorOneArg<E, A>,
    {
        if args.is_empty() {
            return;
        }

        let n = args.len() as i64;
        let high = self.sequencer.next_n(n);
        let low = high - (n - 1);

        let _publish = PendingPublish::range(self.sequencer.as_ref(), low, high);
        for (offset, arg0) in args.into_iter().enumerate() {
            let sequence = low + offset as i64;
            // SAFETY: the range [low, high] was claimed above and is not
            // yet published.
            let event = unsafe { self.get_mut(sequence) };
            translator.translate_to(event, sequence, arg0);
        }
    }

    /// Non-blocking [`publish_events_one_arg`](Self::publish_events_one_arg).
    pub fn try_publish_events_one_arg<T, A>(&self, translator: &T, args: Vec<A>) -> bool
    where
        T: EventTranslatorOneArg<E, A>,
    {
        if args.is_empty() {
            return true;
        }

        let n = args.len() as i64;
        if n > self.slots.len() as i64 {
            return false;
        }

        match self.sequencer.try_next_n(n) {
            Ok(high) => {
                let low = high - (n - 1);
                let _publish = PendingPublish::range(self.sequencer.as_ref(), low, high);
                for (offset, arg0) in args.into_iter().enumerate() {
                    let sequence = low + offset as i64;
                    // SAFETY: the range [low, high] was claimed above and is
                    // not yet published.
                    let event = unsafe { self.get_mut(sequence) };
                    translator.translate_to(event, sequence, arg0);
                }
                true
            }
            Err(_) => false,
        }
    }
}

impl<E> fmt::Debug for RingBuffer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.slots.len())
            .field("sequencer", &self.sequencer)
            .finish()
    }
}

/// Publishes a claimed range when dropped, so claims commit even when a
/// translator panics mid-fill.
struct PendingPublish<'a> {
    sequencer: &'a dyn Sequencer,
    low: i64,
    high: i64,
}

impl<'a> PendingPublish<'a> {
    fn single(sequencer: &'a dyn Sequencer, sequence: i64) -> Self {
        Self {
            sequencer,
            low: sequence,
            high: sequence,
        }
    }

    fn range(sequencer: &'a dyn Sequencer, low: i64, high: i64) -> Self {
        Self {
            sequencer,
            low,
            high,
        }
    }
}

impl Drop for PendingPublish<'_> {
    fn drop(&mut self) {
        if self.low == self.high {
            self.sequencer.publish(self.high);
        } else {
            self.sequencer.publish_range(self.low, self.high);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_factory::DefaultEventFactory;
    use crate::event_translator::{event_translator, event_translator_one_arg};
    use crate::wait_strategy::BusySpinWaitStrategy;

    #[derive(Debug, Default)]
    struct TestEvent {
        value: i64,
    }

    fn ring(producer_type: ProducerType, buffer_size: usize) -> RingBuffer<TestEvent> {
        RingBuffer::new(
            producer_type,
            DefaultEventFactory::<TestEvent>::new(),
            buffer_size,
            Arc::new(BusySpinWaitStrategy::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_buffer_sizes() {
        for buffer_size in [0usize, 3, 6, 7, 12] {
            let result = RingBuffer::<TestEvent>::new(
                ProducerType::Single,
                DefaultEventFactory::new(),
                buffer_size,
                Arc::new(BusySpinWaitStrategy::new()),
            );
            assert_eq!(
                result.unwrap_err(),
                RingBusError::InvalidBufferSize(buffer_size)
            );
        }
    }

    #[test]
    fn test_minimum_buffer_size_is_one() {
        let ring = ring(ProducerType::Single, 1);
        assert_eq!(ring.get_buffer_size(), 1);
    }

    #[test]
    fn test_sequences_alias_slots_modulo_size() {
        let ring = ring(ProducerType::Single, 8);

        let slot = ring.get(3) as *const TestEvent;
        let aliased = ring.get(3 + 8) as *const TestEvent;
        let other = ring.get(4) as *const TestEvent;

        assert_eq!(slot, aliased);
        assert_ne!(slot, other);
    }

    #[test]
    fn test_claim_fill_publish_cycle() {
        let ring = ring(ProducerType::Single, 8);

        let sequence = ring.next();
        assert_eq!(sequence, 0);
        assert!(!ring.is_published(sequence));

        // SAFETY: sequence claimed above, not yet published.
        unsafe { ring.get_mut(sequence) }.value = 42;
        ring.publish(sequence);

        assert!(ring.is_published(sequence));
        assert_eq!(ring.get_published(sequence).value, 42);
        assert_eq!(ring.get_cursor(), 0);
    }

    #[test]
    fn test_publish_event_translates_and_publishes() {
        let ring = ring(ProducerType::Single, 8);
        let translator = event_translator(|event: &mut TestEvent, sequence| {
            event.value = sequence * 10;
        });

        ring.publish_event(&translator);
        ring.publish_event(&translator);

        assert_eq!(ring.get(0).value, 0);
        assert_eq!(ring.get(1).value, 10);
        assert_eq!(ring.get_cursor(), 1);
    }

    #[test]
    fn test_try_publish_event_fails_on_full_buffer() {
        let ring = ring(ProducerType::Single, 2);
        let consumer = Arc::new(Sequence::default());
        ring.add_gating_sequences(&[Arc::clone(&consumer)]);

        let translator = event_translator_one_arg(|event: &mut TestEvent, _, value: i64| {
            event.value = value;
        });

        assert!(ring.try_publish_event_one_arg(&translator, 1));
        assert!(ring.try_publish_event_one_arg(&translator, 2));
        assert!(!ring.try_publish_event_one_arg(&translator, 3));

        consumer.set(1);
        assert!(ring.try_publish_event_one_arg(&translator, 3));
    }

    #[test]
    fn test_batch_publish_claims_contiguously() {
        let ring = ring(ProducerType::Multi, 8);
        let translators: Vec<_> = (0..4)
            .map(|_| event_translator(|event: &mut TestEvent, sequence| event.value = sequence))
            .collect();

        ring.publish_events(&translators);

        for sequence in 0..4 {
            assert!(ring.is_published(sequence));
            assert_eq!(ring.get(sequence).value, sequence);
        }
    }

    #[test]
    fn test_batch_publish_one_arg() {
        let ring = ring(ProducerType::Single, 8);
        let translator = event_translator_one_arg(|event: &mut TestEvent, _, value: i64| {
            event.value = value;
        });

        ring.publish_events_one_arg(&translator, vec![10, 20, 30]);

        assert_eq!(ring.get(0).value, 10);
        assert_eq!(ring.get(1).value, 20);
        assert_eq!(ring.get(2).value, 30);
        assert_eq!(ring.get_cursor(), 2);
    }

    #[test]
    fn test_try_publish_events_oversized_batch_refused() {
        let ring = ring(ProducerType::Multi, 4);
        let translators: Vec<_> = (0..5)
            .map(|_| event_translator(|event: &mut TestEvent, sequence| event.value = sequence))
            .collect();

        assert!(!ring.try_publish_events(&translators));
        // Nothing was claimed.
        assert_eq!(ring.get_cursor(), crate::INITIAL_CURSOR_VALUE);
    }

    #[test]
    fn test_empty_batches_are_no_ops() {
        let ring = ring(ProducerType::Single, 4);
        let translators: Vec<ClosureNoop> = Vec::new();

        ring.publish_events(&translators);
        assert!(ring.try_publish_events(&translators));
        assert_eq!(ring.get_cursor(), crate::INITIAL_CURSOR_VALUE);
    }

    type ClosureNoop = crate::event_translator::ClosureEventTranslator<
        TestEvent,
        fn(&mut TestEvent, i64),
    >;

    #[test]
    fn test_translator_panic_still_publishes() {
        let ring = Arc::new(ring(ProducerType::Single, 8));
        let translator = event_translator(|event: &mut TestEvent, sequence| {
            event.value = sequence;
            if sequence == 2 {
                panic!("translator failure");
            }
        });

        ring.publish_event(&translator);
        ring.publish_event(&translator);

        let panicked = {
            let ring = Arc::clone(&ring);
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                ring.publish_event(&translator);
            }))
        };
        assert!(panicked.is_err());

        // The panicking publication still committed; the ring keeps moving.
        assert!(ring.is_published(2));
        assert_eq!(ring.get_cursor(), 2);

        let translator = event_translator(|event: &mut TestEvent, sequence| {
            event.value = sequence;
        });
        ring.publish_event(&translator);
        assert_eq!(ring.get_cursor(), 3);
    }

    #[test]
    fn test_reset_to_repositions_cursor() {
        let ring = ring(ProducerType::Single, 8);
        ring.reset_to(99);

        assert_eq!(ring.get_cursor(), 99);
        assert!(ring.is_published(99));
        assert_eq!(ring.next(), 100);
    }

    #[test]
    fn test_claim_and_get_preallocated_seeds_slot() {
        let ring = ring(ProducerType::Single, 8);

        // SAFETY: nothing else is running; init-time seeding.
        unsafe { ring.claim_and_get_preallocated(2) }.value = 7;
        ring.publish(2);

        assert_eq!(ring.get(2).value, 7);
        assert_eq!(ring.next(), 3);
    }

    #[test]
    fn test_capacity_queries_delegate() {
        let ring = ring(ProducerType::Single, 8);
        let consumer = Arc::new(Sequence::default());
        ring.add_gating_sequences(&[Arc::clone(&consumer)]);

        assert_eq!(ring.remaining_capacity(), 8);
        assert!(ring.has_available_capacity(8));
        assert_eq!(ring.get_minimum_gating_sequence(), -1);

        let translator = event_translator(|event: &mut TestEvent, sequence| {
            event.value = sequence;
        });
        for _ in 0..3 {
            ring.publish_event(&translator);
        }

        assert_eq!(ring.remaining_capacity(), 5);
        assert!(ring.remove_gating_sequence(&consumer));
        assert_eq!(ring.remaining_capacity(), 8);
    }
}
