//! In-memory blocking queue over a `VecDeque`.
//!
//! The classic two-condvar bounded queue, with the condvars replaced by
//! [`PollingMonitor`]s so waits observe cancellation tokens and deadlines.
//! A bound of zero is legal: every plain push reports full, which makes
//! such a queue a pure pass-through tier.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

use crate::{
    error::{PopError, PushError},
    monitor::PollingMonitor,
    queue::BlockingQueue,
    token::CancelToken,
    wait::Wait,
};

pub struct MemoryQueue<T> {
    items: Mutex<VecDeque<T>>,
    bound: Option<usize>,
    not_full: PollingMonitor,
    not_empty: PollingMonitor,
    closed: CachePadded<AtomicBool>,
}

impl<T> MemoryQueue<T> {
    /// A queue holding at most `bound` items (forced pushes excepted).
    pub fn bounded(bound: usize) -> Self {
        Self::with_bound(Some(bound))
    }

    pub fn unbounded() -> Self {
        Self::with_bound(None)
    }

    fn with_bound(bound: Option<usize>) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            bound,
            not_full: PollingMonitor::new(),
            not_empty: PollingMonitor::new(),
            closed: CachePadded::new(AtomicBool::new(false)),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn push_now(&self, item: T) -> Result<(), PushError<T>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }
        let mut items = self.items.lock();
        if self.bound.is_some_and(|b| items.len() >= b) {
            return Err(PushError::Full(item));
        }
        items.push_back(item);
        drop(items);
        self.not_empty.pulse();
        Ok(())
    }

    fn pop_now(&self) -> Result<T, PopError> {
        if self.is_closed() {
            return Err(PopError::Closed);
        }
        let item = self.items.lock().pop_front();
        match item {
            Some(item) => {
                self.not_full.pulse();
                Ok(item)
            }
            None => Err(PopError::TimedOut),
        }
    }
}

impl<T: Send> BlockingQueue for MemoryQueue<T> {
    type Item = T;

    fn push(&self, item: T, wait: Wait, token: &CancelToken) -> Result<(), PushError<T>> {
        if token.is_cancelled() {
            return Err(PushError::Cancelled(item));
        }
        if wait.is_no_wait() {
            return self.push_now(item);
        }
        let waiter = match self.not_full.enter(wait, token) {
            Ok(waiter) => waiter,
            Err(e) => return Err(PushError::from_wait(e, item)),
        };
        let mut item = item;
        loop {
            match self.push_now(item) {
                Ok(()) => return Ok(()),
                Err(PushError::Full(rejected)) => item = rejected,
                Err(e) => return Err(e),
            }
            if waiter.is_timed_out() {
                return Err(PushError::Full(item));
            }
            if let Err(e) = waiter.wait() {
                return Err(PushError::from_wait(e, item));
            }
        }
    }

    fn pop(&self, wait: Wait, token: &CancelToken) -> Result<T, PopError> {
        if token.is_cancelled() {
            return Err(PopError::Cancelled);
        }
        match self.pop_now() {
            Err(PopError::TimedOut) if !wait.is_no_wait() => {}
            other => return other,
        }
        let waiter = self.not_empty.enter(wait, token)?;
        loop {
            match self.pop_now() {
                Err(PopError::TimedOut) => {}
                other => return other,
            }
            if waiter.is_timed_out() {
                return Err(PopError::TimedOut);
            }
            waiter.wait()?;
        }
    }

    fn push_forced(&self, item: T) -> Result<(), PushError<T>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }
        self.items.lock().push_back(item);
        self.not_empty.pulse();
        Ok(())
    }

    fn len(&self) -> Option<usize> {
        Some(self.items.lock().len())
    }

    fn capacity(&self) -> Option<usize> {
        self.bound
    }

    fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.not_full.pulse_all();
        self.not_empty.pulse_all();
    }
}
