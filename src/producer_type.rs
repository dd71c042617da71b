//! Construction-time selection of the sequencer variant.

use std::fmt;
use std::sync::Arc;

use crate::sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
use crate::wait_strategy::WaitStrategy;

/// How many threads will publish into the ring buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerType {
    /// Exactly one publishing thread. The claim path needs no atomic RMW
    /// and no per-slot availability tracking, so this is the fastest mode —
    /// but a second publisher corrupts the sequence protocol.
    Single,

    /// Any number of publishing threads, coordinated through CAS claims and
    /// per-slot availability flags.
    Multi,
}

impl ProducerType {
    /// True for [`ProducerType::Single`].
    pub fn is_single(&self) -> bool {
        matches!(self, ProducerType::Single)
    }

    /// True for [`ProducerType::Multi`].
    pub fn is_multi(&self) -> bool {
        matches!(self, ProducerType::Multi)
    }

    /// Instantiate the matching sequencer.
    pub fn new_sequencer(
        self,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Arc<dyn Sequencer> {
        match self {
            ProducerType::Single => {
                Arc::new(SingleProducerSequencer::new(buffer_size, wait_strategy))
            }
            ProducerType::Multi => {
                Arc::new(MultiProducerSequencer::new(buffer_size, wait_strategy))
            }
        }
    }
}

impl Default for ProducerType {
    /// Multi-producer: correct under any publisher count. Opt into
    /// [`ProducerType::Single`] only when single-threaded publishing is
    /// guaranteed.
    fn default() -> Self {
        ProducerType::Multi
    }
}

impl fmt::Display for ProducerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProducerType::Single => write!(f, "single"),
            ProducerType::Multi => write!(f, "multi"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait_strategy::BusySpinWaitStrategy;

    #[test]
    fn test_predicates() {
        assert!(ProducerType::Single.is_single());
        assert!(!ProducerType::Single.is_multi());
        assert!(ProducerType::Multi.is_multi());
        assert!(!ProducerType::Multi.is_single());
    }

    #[test]
    fn test_default_is_multi() {
        assert_eq!(ProducerType::default(), ProducerType::Multi);
    }

    #[test]
    fn test_display() {
        assert_eq!(ProducerType::Single.to_string(), "single");
        assert_eq!(ProducerType::Multi.to_string(), "multi");
    }

    #[test]
    fn test_new_sequencer_dispatches() {
        let single = ProducerType::Single
            .new_sequencer(8, Arc::new(BusySpinWaitStrategy::new()));
        let multi = ProducerType::Multi
            .new_sequencer(8, Arc::new(BusySpinWaitStrategy::new()));

        // Single-producer publication is cursor-only; multi-producer
        // publication is flag-per-slot. Claiming without publishing makes
        // the difference observable.
        single.claim(0);
        single.publish(0);
        assert!(single.is_available(0));

        multi.next();
        assert!(!multi.is_available(0));
        multi.publish(0);
        assert!(multi.is_available(0));
    }
}
