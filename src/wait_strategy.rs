//! Wait strategies: how a consumer idles until a sequence becomes available.
//!
//! Each strategy trades CPU for latency differently. Blocking parks on a
//! condition variable and costs almost nothing when idle; busy-spin burns a
//! core for the lowest possible wake-up latency; yielding and sleeping sit
//! in between. All of them observe the barrier's alert flag on every
//! iteration so a consumer can be stopped promptly.

use std::fmt;
use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::sequence::Sequence;
use crate::{Result, RingBusError};

/// Policy for waiting until a target sequence satisfies the dependency graph.
pub trait WaitStrategy: Send + Sync + fmt::Debug {
    /// Block until a sequence `s >= sequence` is reachable and return the
    /// highest such `s` observed.
    ///
    /// `cursor` is the sequencer's published cursor; `dependent_sequences`
    /// are the upstream consumer sequences this waiter must stay behind (an
    /// empty slice means the waiter depends on the cursor alone). The
    /// returned value still has to be ratified for contiguity by the
    /// barrier in multi-producer setups.
    ///
    /// # Errors
    /// Returns [`RingBusError::Alerted`] when `alerted` is set while
    /// waiting, or [`RingBusError::Timeout`] from strategies that enforce a
    /// bound.
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64>;

    /// Wake all consumers parked in a blocking wait. No-op for strategies
    /// that never block.
    fn signal_all_when_blocking(&self);
}

/// The sequence the waiter is actually gated on: the slowest upstream
/// consumer when dependencies exist, otherwise the cursor itself.
#[inline]
fn dependent_sequence(cursor: &Sequence, dependent_sequences: &[Arc<Sequence>]) -> i64 {
    if dependent_sequences.is_empty() {
        cursor.get()
    } else {
        Sequence::get_minimum_sequence(dependent_sequences, i64::MAX)
    }
}

#[inline]
fn check_alert(alerted: &AtomicBool) -> Result<()> {
    if alerted.load(Ordering::Acquire) {
        Err(RingBusError::Alerted)
    } else {
        Ok(())
    }
}

/// Park on a mutex/condition variable until publishers signal.
///
/// Lowest CPU cost when idle; the publisher pays a lock acquisition per
/// signal. The wait is bounded at one millisecond per iteration so a missed
/// signal degrades to a bounded re-check instead of a hang.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    lock: Mutex<()>,
    condvar: Condvar,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.lock.lock();
            while cursor.get() < sequence {
                check_alert(alerted)?;
                self.condvar
                    .wait_for(&mut guard, Duration::from_millis(1));
            }
        }

        let mut available_sequence = dependent_sequence(cursor, dependent_sequences);
        while available_sequence < sequence {
            check_alert(alerted)?;
            hint::spin_loop();
            available_sequence = dependent_sequence(cursor, dependent_sequences);
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        // Taking the lock pairs the signal with waiters between their cursor
        // check and the park, closing the missed-wakeup window.
        let _guard = self.lock.lock();
        self.condvar.notify_all();
    }
}

/// [`BlockingWaitStrategy`] with a deadline.
///
/// Raises [`RingBusError::Timeout`] when the bound elapses before the
/// sequence becomes available. Consumer loops usually map the timeout to a
/// housekeeping hook and keep waiting.
#[derive(Debug)]
pub struct TimeoutBlockingWaitStrategy {
    lock: Mutex<()>,
    condvar: Condvar,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            lock: Mutex::new(()),
            condvar: Condvar::new(),
            timeout,
        }
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        let deadline = Instant::now() + self.timeout;

        if cursor.get() < sequence {
            let mut guard = self.lock.lock();
            while cursor.get() < sequence {
                check_alert(alerted)?;
                let now = Instant::now();
                if now >= deadline {
                    return Err(RingBusError::Timeout);
                }
                let wait = (deadline - now).min(Duration::from_millis(1));
                self.condvar.wait_for(&mut guard, wait);
            }
        }

        let mut available_sequence = dependent_sequence(cursor, dependent_sequences);
        while available_sequence < sequence {
            check_alert(alerted)?;
            if Instant::now() >= deadline {
                return Err(RingBusError::Timeout);
            }
            hint::spin_loop();
            available_sequence = dependent_sequence(cursor, dependent_sequences);
        }

        Ok(available_sequence)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.lock.lock();
        self.condvar.notify_all();
    }
}

/// Spin for a fixed budget, then yield the thread on every miss.
#[derive(Debug, Default)]
pub struct YieldingWaitStrategy;

impl YieldingWaitStrategy {
    const SPIN_TRIES: u32 = 100;

    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        let mut counter = Self::SPIN_TRIES;

        loop {
            let available_sequence = dependent_sequence(cursor, dependent_sequences);
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }

            check_alert(alerted)?;
            if counter > 0 {
                counter -= 1;
                hint::spin_loop();
            } else {
                thread::yield_now();
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Pure spin. Lowest latency, one core pinned at 100% while waiting.
#[derive(Debug, Default)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        loop {
            let available_sequence = dependent_sequence(cursor, dependent_sequences);
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }
            check_alert(alerted)?;
            hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Spin briefly, then yield, then park for short intervals.
///
/// A reasonable default when consumers share cores with other work: close
/// to yielding latency under load, near-zero CPU when the ring is idle.
#[derive(Debug)]
pub struct SleepingWaitStrategy {
    retries: u32,
    sleep: Duration,
}

impl SleepingWaitStrategy {
    const DEFAULT_RETRIES: u32 = 200;
    const DEFAULT_SLEEP: Duration = Duration::from_micros(100);

    pub fn new() -> Self {
        Self {
            retries: Self::DEFAULT_RETRIES,
            sleep: Self::DEFAULT_SLEEP,
        }
    }

    /// Override the park interval used once the spin/yield budget runs out.
    pub fn with_sleep(sleep: Duration) -> Self {
        Self {
            retries: Self::DEFAULT_RETRIES,
            sleep,
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        let mut counter = self.retries;

        loop {
            let available_sequence = dependent_sequence(cursor, dependent_sequences);
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }

            check_alert(alerted)?;
            if counter > 100 {
                counter -= 1;
                hint::spin_loop();
            } else if counter > 0 {
                counter -= 1;
                thread::yield_now();
            } else {
                thread::park_timeout(self.sleep);
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_ready(strategy: &dyn WaitStrategy) {
        let cursor = Sequence::new(10);
        let alerted = AtomicBool::new(false);

        let available = strategy.wait_for(5, &cursor, &[], &alerted).unwrap();
        assert_eq!(available, 10);
    }

    fn wait_alerted(strategy: &dyn WaitStrategy) {
        let cursor = Sequence::new(-1);
        let alerted = AtomicBool::new(true);

        let result = strategy.wait_for(0, &cursor, &[], &alerted);
        assert_eq!(result.unwrap_err(), RingBusError::Alerted);
    }

    #[test]
    fn test_ready_sequence_returns_immediately() {
        wait_ready(&BlockingWaitStrategy::new());
        wait_ready(&TimeoutBlockingWaitStrategy::new(Duration::from_millis(10)));
        wait_ready(&YieldingWaitStrategy::new());
        wait_ready(&BusySpinWaitStrategy::new());
        wait_ready(&SleepingWaitStrategy::new());
    }

    #[test]
    fn test_alert_interrupts_wait() {
        wait_alerted(&BlockingWaitStrategy::new());
        wait_alerted(&TimeoutBlockingWaitStrategy::new(Duration::from_millis(10)));
        wait_alerted(&YieldingWaitStrategy::new());
        wait_alerted(&BusySpinWaitStrategy::new());
        wait_alerted(&SleepingWaitStrategy::new());
    }

    #[test]
    fn test_dependent_sequences_gate_the_result() {
        let strategy = BusySpinWaitStrategy::new();
        let cursor = Sequence::new(20);
        let dependents = vec![Arc::new(Sequence::new(7)), Arc::new(Sequence::new(9))];
        let alerted = AtomicBool::new(false);

        let available = strategy.wait_for(5, &cursor, &dependents, &alerted).unwrap();
        assert_eq!(available, 7);
    }

    #[test]
    fn test_timeout_elapses() {
        let strategy = TimeoutBlockingWaitStrategy::new(Duration::from_millis(5));
        let cursor = Sequence::new(-1);
        let alerted = AtomicBool::new(false);

        let start = Instant::now();
        let result = strategy.wait_for(0, &cursor, &[], &alerted);
        assert_eq!(result.unwrap_err(), RingBusError::Timeout);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_blocking_wait_wakes_on_publish_signal() {
        let strategy = Arc::new(BlockingWaitStrategy::new());
        let cursor = Arc::new(Sequence::new(-1));
        let alerted = Arc::new(AtomicBool::new(false));

        let waiter = {
            let strategy = Arc::clone(&strategy);
            let cursor = Arc::clone(&cursor);
            let alerted = Arc::clone(&alerted);
            thread::spawn(move || strategy.wait_for(0, &cursor, &[], &alerted))
        };

        thread::sleep(Duration::from_millis(10));
        cursor.set(0);
        strategy.signal_all_when_blocking();

        assert_eq!(waiter.join().unwrap().unwrap(), 0);
    }
}
