//! Blocking-queue adapter over a [`flume`] channel.
//!
//! Flume's own timed operations do not observe [`CancelToken`]s, so every
//! wait is sliced at the cancellation grain and the token is re-checked
//! between slices. The adapter holds both channel halves, which keeps the
//! channel connected for its whole life; shutdown is a flag, not a
//! disconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

use crate::{
    error::{PopError, PushError},
    monitor::CANCEL_GRAIN,
    queue::BlockingQueue,
    token::CancelToken,
    wait::Wait,
};

pub struct ChannelQueue<T> {
    tx: flume::Sender<T>,
    rx: flume::Receiver<T>,
    closed: CachePadded<AtomicBool>,
}

impl<T> ChannelQueue<T> {
    pub fn bounded(bound: usize) -> Self {
        let (tx, rx) = flume::bounded(bound);
        Self::from_parts(tx, rx)
    }

    pub fn unbounded() -> Self {
        let (tx, rx) = flume::unbounded();
        Self::from_parts(tx, rx)
    }

    fn from_parts(tx: flume::Sender<T>, rx: flume::Receiver<T>) -> Self {
        Self {
            tx,
            rx,
            closed: CachePadded::new(AtomicBool::new(false)),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn push_once(&self, item: T) -> Result<(), PushError<T>> {
        match self.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(flume::TrySendError::Full(item)) => Err(PushError::Full(item)),
            Err(flume::TrySendError::Disconnected(item)) => Err(PushError::Closed(item)),
        }
    }
}

impl<T: Send> BlockingQueue for ChannelQueue<T> {
    type Item = T;

    fn push(&self, item: T, wait: Wait, token: &CancelToken) -> Result<(), PushError<T>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }
        if token.is_cancelled() {
            return Err(PushError::Cancelled(item));
        }
        let deadline = wait.deadline();
        let mut item = item;
        loop {
            let now = Instant::now();
            let slice = match deadline {
                Some(d) if now >= d => return self.push_once(item),
                Some(d) => CANCEL_GRAIN.min(d - now),
                None => CANCEL_GRAIN,
            };
            match self.tx.send_timeout(item, slice) {
                Ok(()) => return Ok(()),
                Err(flume::SendTimeoutError::Timeout(rejected)) => item = rejected,
                Err(flume::SendTimeoutError::Disconnected(rejected)) => {
                    return Err(PushError::Closed(rejected));
                }
            }
            if self.is_closed() {
                return Err(PushError::Closed(item));
            }
            if token.is_cancelled() {
                return Err(PushError::Cancelled(item));
            }
        }
    }

    fn pop(&self, wait: Wait, token: &CancelToken) -> Result<T, PopError> {
        if self.is_closed() {
            return Err(PopError::Closed);
        }
        if token.is_cancelled() {
            return Err(PopError::Cancelled);
        }
        let deadline = wait.deadline();
        loop {
            let now = Instant::now();
            let slice = match deadline {
                Some(d) if now >= d => {
                    return match self.rx.try_recv() {
                        Ok(item) => Ok(item),
                        Err(flume::TryRecvError::Empty) => Err(PopError::TimedOut),
                        Err(flume::TryRecvError::Disconnected) => Err(PopError::Closed),
                    };
                }
                Some(d) => CANCEL_GRAIN.min(d - now),
                None => CANCEL_GRAIN,
            };
            match self.rx.recv_timeout(slice) {
                Ok(item) => return Ok(item),
                Err(flume::RecvTimeoutError::Timeout) => {}
                Err(flume::RecvTimeoutError::Disconnected) => return Err(PopError::Closed),
            }
            if self.is_closed() {
                return Err(PopError::Closed);
            }
            if token.is_cancelled() {
                return Err(PopError::Cancelled);
            }
        }
    }

    /// A bounded channel cannot overshoot its bound, so a forced push
    /// waits for space instead of rejecting. It still never reports full.
    fn push_forced(&self, item: T) -> Result<(), PushError<T>> {
        let mut item = item;
        loop {
            if self.is_closed() {
                return Err(PushError::Closed(item));
            }
            match self.tx.send_timeout(item, CANCEL_GRAIN) {
                Ok(()) => return Ok(()),
                Err(flume::SendTimeoutError::Timeout(rejected)) => item = rejected,
                Err(flume::SendTimeoutError::Disconnected(rejected)) => {
                    return Err(PushError::Closed(rejected));
                }
            }
        }
    }

    fn len(&self) -> Option<usize> {
        Some(self.rx.len())
    }

    fn capacity(&self) -> Option<usize> {
        self.tx.capacity()
    }

    fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
