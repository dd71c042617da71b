//! Batch consumer loop driven by a sequence barrier.
//!
//! [`BatchEventProcessor`] is the standard read side: it waits on its
//! barrier, hands every newly available event to the handler, then
//! advances its own [`Sequence`] — which the application registers with the
//! ring buffer as a gating sequence so producers cannot lap it. The
//! processor does not spawn threads; run it on a thread you own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::ring_buffer::RingBuffer;
use crate::sequence::Sequence;
use crate::sequence_barrier::SequenceBarrier;
use crate::RingBusError;

/// Callback invoked for each event a processor consumes.
///
/// Events arrive in sequence order with no gaps. `end_of_batch` is true for
/// the last event of the currently available run, which is the natural
/// point to flush any state the handler accumulated across the batch.
pub trait EventHandler<E>: Send {
    fn on_event(&mut self, event: &E, sequence: i64, end_of_batch: bool);

    /// Called once before the first event.
    fn on_start(&mut self) {}

    /// Called once after the loop exits.
    fn on_shutdown(&mut self) {}

    /// Called when a bounded wait strategy times out; the processor keeps
    /// waiting afterwards.
    fn on_timeout(&mut self, _sequence: i64) {}
}

/// Runs an [`EventHandler`] over every published event, in batches.
pub struct BatchEventProcessor<E, H>
where
    E: Send + Sync,
    H: EventHandler<E>,
{
    ring_buffer: Arc<RingBuffer<E>>,
    barrier: Arc<SequenceBarrier>,
    handler: H,
    sequence: Arc<Sequence>,
    running: Arc<AtomicBool>,
}

impl<E, H> BatchEventProcessor<E, H>
where
    E: Send + Sync,
    H: EventHandler<E>,
{
    pub fn new(ring_buffer: Arc<RingBuffer<E>>, barrier: SequenceBarrier, handler: H) -> Self {
        Self {
            ring_buffer,
            barrier: Arc::new(barrier),
            handler,
            sequence: Arc::new(Sequence::default()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The progress sequence of this processor. Register it as a gating
    /// sequence on the ring buffer, and as a barrier dependency of any
    /// downstream processor.
    pub fn sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    /// Handle for stopping the processor from another thread.
    pub fn halt_handle(&self) -> HaltHandle {
        HaltHandle {
            running: Arc::clone(&self.running),
            barrier: Arc::clone(&self.barrier),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Process events until the barrier is alerted. Blocks the calling
    /// thread; returns after [`HaltHandle::halt`] or a bare barrier alert.
    pub fn run(&mut self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.barrier.clear_alert();
        self.handler.on_start();
        debug!("event processor started");

        let mut next_sequence = self.sequence.get() + 1;
        loop {
            match self.barrier.wait_for(next_sequence) {
                Ok(available_sequence) => {
                    while next_sequence <= available_sequence {
                        let event = self.ring_buffer.get(next_sequence);
                        self.handler
                            .on_event(event, next_sequence, next_sequence == available_sequence);
                        next_sequence += 1;
                    }
                    self.sequence.set(available_sequence);
                }
                Err(RingBusError::Timeout) => {
                    self.handler.on_timeout(next_sequence - 1);
                }
                Err(_) => break,
            }
        }

        self.handler.on_shutdown();
        self.running.store(false, Ordering::Release);
        debug!("event processor halted");
    }
}

/// Stops a [`BatchEventProcessor`] cooperatively.
#[derive(Clone)]
pub struct HaltHandle {
    running: Arc<AtomicBool>,
    barrier: Arc<SequenceBarrier>,
}

impl HaltHandle {
    /// Request the processor to stop and wake it if it is parked.
    pub fn halt(&self) {
        debug!("halting event processor");
        self.running.store(false, Ordering::Release);
        self.barrier.alert();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_factory::DefaultEventFactory;
    use crate::event_translator::event_translator_one_arg;
    use crate::producer_type::ProducerType;
    use crate::wait_strategy::BlockingWaitStrategy;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct TestEvent {
        value: i64,
    }

    struct Collector {
        sender: mpsc::Sender<(i64, i64, bool)>,
    }

    impl EventHandler<TestEvent> for Collector {
        fn on_event(&mut self, event: &TestEvent, sequence: i64, end_of_batch: bool) {
            self.sender.send((sequence, event.value, end_of_batch)).unwrap();
        }
    }

    #[test]
    fn test_processor_consumes_in_order_and_halts() {
        let ring = Arc::new(
            RingBuffer::new(
                ProducerType::Single,
                DefaultEventFactory::<TestEvent>::new(),
                8,
                Arc::new(BlockingWaitStrategy::new()),
            )
            .unwrap(),
        );

        let (sender, receiver) = mpsc::channel();
        let barrier = ring.new_barrier(&[]);
        let mut processor = BatchEventProcessor::new(Arc::clone(&ring), barrier, Collector { sender });
        ring.add_gating_sequences(&[processor.sequence()]);

        let halt = processor.halt_handle();
        let consumer = thread::spawn(move || processor.run());

        let translator = event_translator_one_arg(|event: &mut TestEvent, _, value: i64| {
            event.value = value;
        });
        for value in 0..5 {
            ring.publish_event_one_arg(&translator, value * 100);
        }

        for expected in 0..5 {
            let (sequence, value, _) = receiver
                .recv_timeout(Duration::from_secs(5))
                .expect("event not delivered");
            assert_eq!(sequence, expected);
            assert_eq!(value, expected * 100);
        }

        halt.halt();
        consumer.join().unwrap();
    }

    #[test]
    fn test_end_of_batch_flags_last_available_event() {
        let ring = Arc::new(
            RingBuffer::new(
                ProducerType::Single,
                DefaultEventFactory::<TestEvent>::new(),
                8,
                Arc::new(BlockingWaitStrategy::new()),
            )
            .unwrap(),
        );

        let (sender, receiver) = mpsc::channel();
        let barrier = ring.new_barrier(&[]);
        let mut processor = BatchEventProcessor::new(Arc::clone(&ring), barrier, Collector { sender });
        ring.add_gating_sequences(&[processor.sequence()]);

        // Publish the whole batch before the processor starts so it sees
        // one three-event run.
        let translator = event_translator_one_arg(|event: &mut TestEvent, _, value: i64| {
            event.value = value;
        });
        ring.publish_events_one_arg(&translator, vec![1, 2, 3]);

        let halt = processor.halt_handle();
        let consumer = thread::spawn(move || processor.run());

        let mut flags = Vec::new();
        for _ in 0..3 {
            let (_, _, end_of_batch) = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
            flags.push(end_of_batch);
        }
        assert_eq!(flags, vec![false, false, true]);

        halt.halt();
        consumer.join().unwrap();
    }
}
