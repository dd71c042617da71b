//! Consumer-side coordination: waiting for sequences to become readable.
//!
//! A barrier resolves "when is sequence `s` safe to read?" for one consumer
//! stage. It waits through the sequencer's wait strategy, stays behind any
//! upstream consumer sequences it depends on, and ratifies the result
//! against the sequencer's published record so multi-producer gaps are
//! never handed to a consumer.

use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::sequence::Sequence;
use crate::sequencer::Sequencer;
use crate::wait_strategy::WaitStrategy;
use crate::{Result, RingBusError};

/// Coordination point between a consumer and everything it waits on.
#[derive(Debug)]
pub struct SequenceBarrier {
    sequencer: Arc<dyn Sequencer>,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    dependent_sequences: Vec<Arc<Sequence>>,
    alerted: AtomicBool,
}

impl SequenceBarrier {
    /// Create a barrier over `sequencer`, gated on `dependent_sequences`.
    ///
    /// An empty dependency set means the barrier waits on the publish
    /// cursor alone; otherwise the barrier never reports a sequence beyond
    /// the slowest dependency.
    pub fn new(sequencer: Arc<dyn Sequencer>, dependent_sequences: Vec<Arc<Sequence>>) -> Self {
        Self {
            wait_strategy: sequencer.wait_strategy(),
            cursor: sequencer.get_cursor(),
            sequencer,
            dependent_sequences,
            alerted: AtomicBool::new(false),
        }
    }

    /// Wait for `sequence` and return the highest sequence available for
    /// consumption, which may be higher than requested.
    ///
    /// # Errors
    /// [`RingBusError::Alerted`] when the barrier is alerted before or
    /// during the wait; [`RingBusError::Timeout`] from bounded wait
    /// strategies.
    pub fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;

        let available_sequence = self.wait_strategy.wait_for(
            sequence,
            &self.cursor,
            &self.dependent_sequences,
            &self.alerted,
        )?;

        if available_sequence < sequence {
            return Ok(available_sequence);
        }

        // Pair with the publisher's release stores before reading slots.
        fence(Ordering::Acquire);

        Ok(self
            .sequencer
            .get_highest_published_sequence(sequence, available_sequence))
    }

    /// Current value of the cursor this barrier tracks.
    pub fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }

    /// Whether the barrier is in the alerted state.
    pub fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    /// Alert the barrier, waking any parked waiter.
    pub fn alert(&self) {
        trace!("barrier alerted");
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Clear the alert so the barrier can be waited on again.
    pub fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    /// Fast path used between consumer iterations.
    ///
    /// # Errors
    /// [`RingBusError::Alerted`] when the barrier is alerted.
    pub fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            Err(RingBusError::Alerted)
        } else {
            Ok(())
        }
    }
}
