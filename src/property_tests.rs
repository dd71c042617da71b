//! Property-based tests over the coordination primitives.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use crate::event_factory::DefaultEventFactory;
use crate::producer_type::ProducerType;
use crate::ring_buffer::RingBuffer;
use crate::sequence::Sequence;
use crate::sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
use crate::wait_strategy::BusySpinWaitStrategy;

mod sequence_properties {
    use super::*;

    proptest! {
        #[test]
        fn set_then_get_round_trips(value in any::<i64>()) {
            let sequence = Sequence::new(0);
            sequence.set(value);
            prop_assert_eq!(sequence.get(), value);
        }

        #[test]
        fn add_and_get_is_consistent(initial in -1_000_000i64..1_000_000, delta in 1i64..1000) {
            let sequence = Sequence::new(initial);
            prop_assert_eq!(sequence.add_and_get(delta), initial + delta);
            prop_assert_eq!(sequence.get(), initial + delta);
        }

        #[test]
        fn compare_and_set_succeeds_on_expected(initial in any::<i64>(), new in any::<i64>()) {
            let sequence = Sequence::new(initial);
            prop_assert!(sequence.compare_and_set(initial, new));
            prop_assert_eq!(sequence.get(), new);
        }

        #[test]
        fn compare_and_set_fails_on_mismatch(
            initial in any::<i64>(),
            expected in any::<i64>(),
            new in any::<i64>(),
        ) {
            prop_assume!(expected != initial);
            let sequence = Sequence::new(initial);
            prop_assert!(!sequence.compare_and_set(expected, new));
            prop_assert_eq!(sequence.get(), initial);
        }
    }
}

mod ring_buffer_properties {
    use super::*;

    proptest! {
        #[test]
        fn sequences_alias_slots_modulo_size(
            size_power in 0u32..10,
            sequence in 0i64..1_000_000,
        ) {
            let buffer_size = 1usize << size_power;
            let ring = RingBuffer::<i64>::new(
                ProducerType::Single,
                DefaultEventFactory::new(),
                buffer_size,
                Arc::new(BusySpinWaitStrategy::new()),
            ).unwrap();

            let slot = ring.get(sequence) as *const i64;
            let aliased = ring.get(sequence + buffer_size as i64) as *const i64;
            prop_assert_eq!(slot, aliased);
        }

        #[test]
        fn non_power_of_two_sizes_are_rejected(buffer_size in 0usize..4096) {
            prop_assume!(buffer_size == 0 || !buffer_size.is_power_of_two());
            let result = RingBuffer::<i64>::new(
                ProducerType::Single,
                DefaultEventFactory::new(),
                buffer_size,
                Arc::new(BusySpinWaitStrategy::new()),
            );
            prop_assert!(result.is_err());
        }
    }
}

mod single_producer_properties {
    use super::*;

    proptest! {
        #[test]
        fn claims_are_strictly_increasing(
            size_power in 4u32..10,
            batch_sizes in prop::collection::vec(1i64..8, 1..32),
        ) {
            let buffer_size = 1usize << size_power;
            let sequencer = SingleProducerSequencer::new(
                buffer_size,
                Arc::new(BusySpinWaitStrategy::new()),
            );

            let mut last = crate::INITIAL_CURSOR_VALUE;
            for n in batch_sizes {
                if let Ok(sequence) = sequencer.try_next_n(n) {
                    prop_assert!(sequence > last);
                    sequencer.publish(sequence);
                    last = sequence;
                }
            }
        }

        #[test]
        fn publish_makes_claims_available(
            size_power in 2u32..8,
            claims in prop::collection::vec(1i64..4, 1..8),
        ) {
            let buffer_size = 1usize << size_power;
            let sequencer = SingleProducerSequencer::new(
                buffer_size,
                Arc::new(BusySpinWaitStrategy::new()),
            );

            for n in claims {
                if let Ok(sequence) = sequencer.try_next_n(n) {
                    prop_assert!(!sequencer.is_available(sequence));
                    sequencer.publish(sequence);
                    prop_assert!(sequencer.is_available(sequence));
                }
            }
        }
    }
}

mod multi_producer_properties {
    use super::*;

    proptest! {
        #[test]
        fn claims_never_overlap(
            size_power in 4u32..8,
            batch_sizes in prop::collection::vec(1i64..4, 1..16),
        ) {
            let buffer_size = 1usize << size_power;
            let sequencer = MultiProducerSequencer::new(
                buffer_size,
                Arc::new(BusySpinWaitStrategy::new()),
            );

            let mut seen = HashSet::new();
            for n in batch_sizes {
                if let Ok(high) = sequencer.try_next_n(n) {
                    for sequence in (high - (n - 1))..=high {
                        prop_assert!(seen.insert(sequence));
                    }
                    sequencer.publish_range(high - (n - 1), high);
                }
            }
        }

        #[test]
        fn publish_order_does_not_affect_availability(
            size_power in 3u32..8,
            claim_count in 2usize..8,
        ) {
            let buffer_size = 1usize << size_power;
            let sequencer = MultiProducerSequencer::new(
                buffer_size,
                Arc::new(BusySpinWaitStrategy::new()),
            );

            let claims: Vec<i64> = (0..claim_count)
                .filter_map(|_| sequencer.try_next().ok())
                .collect();

            // Publish in reverse claim order; every slot still becomes
            // available, and the contiguous prefix only completes when the
            // lowest claim lands.
            for &sequence in claims.iter().rev() {
                sequencer.publish(sequence);
                prop_assert!(sequencer.is_available(sequence));
            }

            let highest = claims.iter().copied().max().unwrap();
            prop_assert_eq!(
                sequencer.get_highest_published_sequence(0, highest),
                highest
            );
        }
    }
}
