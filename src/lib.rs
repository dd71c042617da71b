//! `ringbus` — high-throughput, low-latency inter-thread event exchange.
//!
//! A fixed array of pre-allocated event slots is handed between producer
//! and consumer threads using monotonic 64-bit sequence counters: producers
//! claim a sequence, mutate the slot it addresses, and publish it; consumers
//! wait on a barrier for the next contiguous run of published sequences and
//! feed their own progress back as a gating sequence so no slot is reused
//! while still being read. There is no per-event allocation and, outside
//! the blocking wait strategy, no lock on any path.
//!
//! ## Components
//!
//! - [`Sequence`]: cache-line-padded atomic counter, the unit of all
//!   coordination.
//! - [`Sequencer`] ([`SingleProducerSequencer`], [`MultiProducerSequencer`]):
//!   claim/gate/publish protocols on the producer side.
//! - [`SequenceBarrier`]: the consumer-side answer to "when is sequence `s`
//!   safe to read?", including dependencies on upstream consumers.
//! - [`WaitStrategy`]: pluggable idling policy — [`BlockingWaitStrategy`],
//!   [`YieldingWaitStrategy`], [`BusySpinWaitStrategy`],
//!   [`SleepingWaitStrategy`], [`TimeoutBlockingWaitStrategy`].
//! - [`RingBuffer`]: the slot array plus the producer/consumer facing API,
//!   with claim-mutate-publish helpers that publish on every exit path.
//! - [`BatchEventProcessor`] / [`EventHandler`]: a ready-made consumer
//!   loop; run it on your own thread.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use ringbus::{
//!     event_translator_one_arg, BlockingWaitStrategy, DefaultEventFactory, ProducerType,
//!     RingBuffer, Sequence,
//! };
//!
//! #[derive(Debug, Default)]
//! struct Tick {
//!     price: i64,
//! }
//!
//! let ring = RingBuffer::new(
//!     ProducerType::Single,
//!     DefaultEventFactory::<Tick>::new(),
//!     8,
//!     Arc::new(BlockingWaitStrategy::new()),
//! )?;
//!
//! // A consumer announces itself through a gating sequence and waits
//! // through a barrier.
//! let consumer = Arc::new(Sequence::default());
//! ring.add_gating_sequences(&[Arc::clone(&consumer)]);
//! let barrier = ring.new_barrier(&[]);
//!
//! // Claim, mutate, publish in one scoped call.
//! let translator = event_translator_one_arg(|event: &mut Tick, _sequence, price: i64| {
//!     event.price = price;
//! });
//! ring.publish_event_one_arg(&translator, 42);
//!
//! let available = barrier.wait_for(0)?;
//! assert_eq!(available, 0);
//! assert_eq!(ring.get(0).price, 42);
//! consumer.set(available); // frees the slot for reuse
//! # Ok::<(), ringbus::RingBusError>(())
//! ```

pub mod event_factory;
pub mod event_processor;
pub mod event_translator;
pub mod producer_type;
pub mod ring_buffer;
pub mod sequence;
pub mod sequence_barrier;
pub mod sequencer;
pub mod wait_strategy;

#[cfg(test)]
mod property_tests;

pub use event_factory::{ClosureEventFactory, DefaultEventFactory, EventFactory};
pub use event_processor::{BatchEventProcessor, EventHandler, HaltHandle};
pub use event_translator::{
    event_translator, event_translator_one_arg, event_translator_three_arg,
    event_translator_two_arg, event_translator_vararg, ClosureEventTranslator,
    ClosureEventTranslatorOneArg, ClosureEventTranslatorThreeArg, ClosureEventTranslatorTwoArg,
    ClosureEventTranslatorVararg, EventTranslator, EventTranslatorOneArg, EventTranslatorThreeArg,
    EventTranslatorTwoArg, EventTranslatorVararg,
};
pub use producer_type::ProducerType;
pub use ring_buffer::RingBuffer;
pub use sequence::Sequence;
pub use sequence_barrier::SequenceBarrier;
pub use sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy,
    TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
};

/// Initial value of every [`Sequence`]: nothing published yet.
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Errors surfaced by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RingBusError {
    /// A non-blocking claim would have had to wait for consumers.
    #[error("insufficient capacity in ring buffer")]
    InsufficientCapacity,

    /// The barrier was alerted while waiting; the consumer should wind down.
    #[error("sequence barrier alerted")]
    Alerted,

    /// A bounded wait strategy hit its deadline.
    #[error("timed out waiting for sequence")]
    Timeout,

    /// Ring buffers require a power-of-two capacity of at least one.
    #[error("buffer size must be a power of two, got {0}")]
    InvalidBufferSize(usize),
}

pub type Result<T> = std::result::Result<T, RingBusError>;
