//! Fixed-interval retry scheduler driven by the relay worker.
//!
//! The scheduler has two states. While idle its ticker is
//! [`crossbeam_channel::never`]; arming swaps in a
//! [`crossbeam_channel::tick`] receiver the worker selects on. The armed flag
//! itself is shared with producers so they can tell whether an immediate send
//! attempt is needed.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, never, tick};

/// Period between retries while a delivery is outstanding.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(15);

/// Observable state of the retry scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    /// No retry cycle is running.
    Idle,
    /// The ticker is running and will re-attempt the queue head.
    Armed,
}

/// Read-only view of the armed flag handed to producers.
#[derive(Clone, Debug)]
pub(crate) struct RetryFlag(Arc<AtomicBool>);

impl RetryFlag {
    pub(crate) fn state(&self) -> RetryState {
        if self.0.load(Ordering::SeqCst) {
            RetryState::Armed
        } else {
            RetryState::Idle
        }
    }
}

pub(crate) struct RetryScheduler {
    armed: Arc<AtomicBool>,
    interval: Duration,
    ticker: Receiver<Instant>,
}

impl RetryScheduler {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            armed: Arc::new(AtomicBool::new(false)),
            interval,
            ticker: never(),
        }
    }

    pub(crate) fn flag(&self) -> RetryFlag {
        RetryFlag(Arc::clone(&self.armed))
    }

    /// Start the ticker unless it is already running.
    pub(crate) fn arm(&mut self) {
        if !self.armed.swap(true, Ordering::SeqCst) {
            self.ticker = tick(self.interval);
        }
    }

    /// Stop the ticker.
    pub(crate) fn disarm(&mut self) {
        self.armed.store(false, Ordering::SeqCst);
        self.ticker = never();
    }

    pub(crate) fn state(&self) -> RetryState {
        self.flag().state()
    }

    /// Receiver yielding one message per retry tick.
    pub(crate) fn ticks(&self) -> &Receiver<Instant> {
        &self.ticker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_without_ticks() {
        let scheduler = RetryScheduler::new(Duration::from_millis(5));
        assert_eq!(scheduler.state(), RetryState::Idle);
        assert!(
            scheduler
                .ticks()
                .recv_timeout(Duration::from_millis(30))
                .is_err()
        );
    }

    #[test]
    fn armed_scheduler_ticks_periodically() {
        let mut scheduler = RetryScheduler::new(Duration::from_millis(5));
        scheduler.arm();
        assert_eq!(scheduler.state(), RetryState::Armed);
        for _ in 0..3 {
            scheduler
                .ticks()
                .recv_timeout(Duration::from_secs(1))
                .expect("tick while armed");
        }
    }

    #[test]
    fn arming_twice_keeps_the_running_ticker() {
        let mut scheduler = RetryScheduler::new(Duration::from_secs(3600));
        scheduler.arm();
        let first = scheduler.ticks().clone();
        scheduler.arm();
        assert!(first.same_channel(scheduler.ticks()));
    }

    #[test]
    fn disarm_returns_to_idle() {
        let mut scheduler = RetryScheduler::new(Duration::from_millis(5));
        let flag = scheduler.flag();
        scheduler.arm();
        assert_eq!(flag.state(), RetryState::Armed);
        scheduler.disarm();
        assert_eq!(flag.state(), RetryState::Idle);
        assert!(
            scheduler
                .ticks()
                .recv_timeout(Duration::from_millis(30))
                .is_err()
        );
    }
}
