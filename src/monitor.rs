//! A condition variable with a bounded poll period.
//!
//! The queues composed by [`TieredQueue`](crate::TieredQueue) are mutated
//! through their own references, so a plain wait/notify pair would miss
//! wakeups caused by anyone the monitor does not know about. Instead of a
//! unified readiness handle (which not every queue can provide), a blocked
//! caller re-probes the queues at a hard interval: a pulse wakes it early,
//! and the poll period caps how stale its view can get.
//!
//! Two deviations from a textbook condvar:
//!
//! - [`Waiter::wait`] always returns within the poll period, pulsed or
//!   not. `Ok` means "re-probe now", nothing more.
//! - [`PollingMonitor::waiter_count`] is exposed so producers/consumers can
//!   skip the whole dance when nobody is blocked.
//!
//! Cancellation tokens are observed at a much finer grain than the poll
//! period, so a tripped token unblocks its waiter promptly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex};

use crate::{error::WaitError, token::CancelToken, wait::Wait};

/// Default interval between forced re-probes of external state.
pub const POLL_PERIOD: Duration = Duration::from_secs(2);

/// How often a blocked wait re-checks its cancellation token.
pub(crate) const CANCEL_GRAIN: Duration = Duration::from_millis(25);

pub struct PollingMonitor {
    /// Latched wakeups, capped at the waiter count so pulses delivered in
    /// the window between registration and blocking are not lost, while
    /// pulses with no audience are dropped.
    pulses: Mutex<usize>,
    cond: Condvar,
    waiters: CachePadded<AtomicUsize>,
    poll_period: Duration,
}

impl PollingMonitor {
    pub fn new() -> Self {
        Self::with_poll_period(POLL_PERIOD)
    }

    pub fn with_poll_period(poll_period: Duration) -> Self {
        Self {
            pulses: Mutex::new(0),
            cond: Condvar::new(),
            waiters: CachePadded::new(AtomicUsize::new(0)),
            poll_period,
        }
    }

    /// Number of currently registered waiters.
    pub fn waiter_count(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }

    /// Wakes one registered waiter. A no-op when no one is waiting.
    pub fn pulse(&self) {
        if self.waiter_count() == 0 {
            return;
        }
        let mut pulses = self.pulses.lock();
        if *pulses < self.waiter_count() {
            *pulses += 1;
        }
        self.cond.notify_one();
    }

    /// Wakes every registered waiter. Used on disposal.
    pub fn pulse_all(&self) {
        let mut pulses = self.pulses.lock();
        *pulses = self.waiter_count();
        self.cond.notify_all();
    }

    /// Registers as a waiter. Fails fast when the token has already
    /// tripped. The registration is released when the [`Waiter`] drops.
    pub fn enter(&self, wait: Wait, token: &CancelToken) -> Result<Waiter<'_>, WaitError> {
        if token.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        self.waiters.fetch_add(1, Ordering::AcqRel);
        Ok(Waiter {
            monitor: self,
            deadline: wait.deadline(),
            token: token.clone(),
        })
    }
}

impl Default for PollingMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped registration on a [`PollingMonitor`].
pub struct Waiter<'m> {
    monitor: &'m PollingMonitor,
    deadline: Option<Instant>,
    token: CancelToken,
}

impl Waiter<'_> {
    /// True once the caller-supplied overall deadline has passed.
    pub fn is_timed_out(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Blocks until pulsed, the poll period elapses, the overall deadline
    /// passes, or the token trips — whichever comes first. `Ok` means the
    /// caller should re-probe (and check [`is_timed_out`](Self::is_timed_out));
    /// cancellation is the only error.
    pub fn wait(&self) -> Result<(), WaitError> {
        let poll_deadline = Instant::now() + self.monitor.poll_period;
        let mut pulses = self.monitor.pulses.lock();
        loop {
            if *pulses > 0 {
                *pulses -= 1;
                return Ok(());
            }
            if self.token.is_cancelled() {
                return Err(WaitError::Cancelled);
            }
            let now = Instant::now();
            if now >= poll_deadline || self.deadline.is_some_and(|d| now >= d) {
                return Ok(());
            }
            let mut slice = CANCEL_GRAIN.min(poll_deadline - now);
            if let Some(d) = self.deadline {
                slice = slice.min(d - now);
            }
            self.monitor.cond.wait_for(&mut pulses, slice);
        }
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        self.monitor.waiters.fetch_sub(1, Ordering::AcqRel);
    }
}
