//! Two-tier blocking queue.
//!
//! A [`TieredQueue`] composes a small, fast "hot" queue with a large, slow
//! "cold" queue behind a single blocking interface, so producers rarely
//! touch the slow tier and consumers rarely wait:
//!
//!```text
//!             ┌─────────────────────────────────┐
//!  producers  │  hot tier   (small, fast)       │  consumers
//!  ──push──►  │  ┌───┬───┬───┐                  │  ──pop──►
//!             │  │ 0 │ 1 │ 2 │ ◄─── promoter ── │
//!             │  └───┴───┴───┘        ▲         │
//!             │  cold tier  (large, slow)       │
//!             │  ┌───┬───┬───┬───┬───┬───┐      │
//!             │  │ 3 │ 4 │ 5 │ 6 │ 7 │ 8 │      │
//!             │  └───┴───┴───┴───┴───┴───┘      │
//!             └─────────────────────────────────┘
//!```
//!
//! ## Routing modes
//!
//! | Mode | Push goes to | Cross-tier order |
//! |------|--------------|------------------|
//! | [`Mode::Ordered`] | hot only while cold is empty, else cold | admission order, always |
//! | [`Mode::HotFirst`] | hot when it has room, else cold | undefined |
//!
//! `Ordered` keeps global FIFO by construction: once anything sits in the
//! cold tier, every later item lands behind it, and the promoter moves
//! items back up strictly in order.
//!
//! ## Background promotion
//!
//! With [`TieredQueue::with_promoter`] a dedicated thread drains the cold
//! tier into the hot tier whenever consumers are idle. In `Ordered` mode
//! the promoter and the consumers share a [`TwoGate`](crate::TwoGate): a
//! consumer that finds the hot tier empty preempts the promoter before
//! looking at the cold tier, so a half-finished move can never make two
//! items swap places. A move interrupted mid-flight force-lands its item
//! in the hot tier — cancellation never drops data.
//!
//! ## Blocking and wakeups
//!
//! The tiers block independently and expose no common wait handle, so
//! producers and consumers park on [`PollingMonitor`]s and re-probe: a
//! pulse from the opposite side wakes them early, the poll period bounds
//! how long an externally-caused state change can go unnoticed.

mod promote;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_utils::{Backoff, CachePadded};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    error::{PopError, PushError},
    gate::{Side, TwoGate},
    monitor::PollingMonitor,
    queue::BlockingQueue,
    token::CancelToken,
    wait::Wait,
};

/// Routing policy for incoming items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Cross-tier FIFO: an item may enter the hot tier only while the cold
    /// tier is empty, so consumers always observe admission order.
    Ordered,
    /// Hot-tier locality: every push tries the hot tier first and spills
    /// to the cold tier when it is full. Each tier stays FIFO internally;
    /// cross-tier ordering is given up.
    HotFirst,
}

/// State shared between the queue handle and the promoter thread.
struct Core<H, C> {
    hot: H,
    cold: C,
    mode: Mode,
    add_monitor: PollingMonitor,
    take_monitor: PollingMonitor,
    /// Parks the promoter while the cold tier is empty; pulsed by pushes
    /// that land cold.
    promote_monitor: PollingMonitor,
    gate: Option<TwoGate>,
    /// Task-level cancellation, tripped once at close.
    stop: CancelToken,
    closed: CachePadded<AtomicBool>,
    /// Raised by the promoter before it extracts an item and lowered once
    /// the item has landed in the hot tier. Ordered pushes treat a raised
    /// flag like a non-empty cold tier, so an admission can never overtake
    /// an item that is momentarily in neither tier.
    migrating: CachePadded<AtomicBool>,
    spin_threshold: usize,
}

impl<H, C> Core<H, C>
where
    H: BlockingQueue,
    C: BlockingQueue<Item = H::Item>,
{
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn is_migrating(&self) -> bool {
        self.migrating.load(Ordering::SeqCst)
    }

    /// Zero-wait push, hot tier first.
    fn push_now(&self, item: H::Item) -> Result<(), PushError<H::Item>> {
        match self.hot.push(item, Wait::NoWait, CancelToken::never()) {
            Err(PushError::Full(item)) => {
                let res = self.cold.push(item, Wait::NoWait, CancelToken::never());
                if res.is_ok() {
                    self.promote_monitor.pulse();
                }
                res
            }
            other => other,
        }
    }

    /// Zero-wait pop, hot tier first. `Ok(None)` means both tiers came up
    /// empty.
    fn pop_now(&self) -> Result<Option<H::Item>, PopError> {
        match self.hot.pop(Wait::NoWait, CancelToken::never()) {
            Ok(item) => Ok(Some(item)),
            Err(PopError::TimedOut) => match self.cold.pop(Wait::NoWait, CancelToken::never()) {
                Ok(item) => Ok(Some(item)),
                Err(PopError::TimedOut) => Ok(None),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}

/// A blocking queue layered out of two blocking queues.
///
/// See the [module docs](self) for the routing modes and the background
/// promoter. `TieredQueue` implements [`BlockingQueue`] itself, so a
/// tiered queue can serve as a tier of another one.
pub struct TieredQueue<H, C>
where
    H: BlockingQueue,
    C: BlockingQueue<Item = H::Item>,
{
    core: Arc<Core<H, C>>,
    promoter: Mutex<Option<JoinHandle<()>>>,
}

impl<H, C> TieredQueue<H, C>
where
    H: BlockingQueue,
    C: BlockingQueue<Item = H::Item>,
{
    /// Composes `hot` over `cold` without background promotion: items move
    /// up only when consumers reach past the hot tier.
    pub fn new(hot: H, cold: C, mode: Mode) -> Self {
        Self::build(hot, cold, mode, false)
    }

    fn build(hot: H, cold: C, mode: Mode, gated: bool) -> Self {
        let core = Core {
            hot,
            cold,
            mode,
            add_monitor: PollingMonitor::new(),
            take_monitor: PollingMonitor::new(),
            promote_monitor: PollingMonitor::new(),
            gate: gated.then(TwoGate::new),
            stop: CancelToken::new(),
            closed: CachePadded::new(AtomicBool::new(false)),
            migrating: CachePadded::new(AtomicBool::new(false)),
            spin_threshold: num_cpus::get(),
        };
        Self {
            core: Arc::new(core),
            promoter: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> Mode {
        self.core.mode
    }

    /// The fast tier, for inspection. Do not close it from here; the queue
    /// owns its tiers.
    pub fn hot(&self) -> &H {
        &self.core.hot
    }

    /// The slow tier, for inspection. Same caveat as [`hot`](Self::hot).
    pub fn cold(&self) -> &C {
        &self.core.cold
    }

    pub fn has_promoter(&self) -> bool {
        self.core.gate.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Total queued items; `None` as soon as either tier cannot tell.
    pub fn len(&self) -> Option<usize> {
        Some(self.core.hot.len()? + self.core.cold.len()?)
    }

    /// Total capacity; `None` as soon as either tier is unbounded.
    pub fn capacity(&self) -> Option<usize> {
        Some(self.core.hot.capacity()? + self.core.cold.capacity()?)
    }

    pub fn is_empty(&self) -> bool {
        self.core.hot.is_empty() && self.core.cold.is_empty()
    }

    /// Pushes `item` through the routing mode, waiting up to `wait` for
    /// capacity. The item comes back inside the error when the push fails.
    pub fn try_push(
        &self,
        item: H::Item,
        wait: Wait,
        token: &CancelToken,
    ) -> Result<(), PushError<H::Item>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }
        if token.is_cancelled() {
            return Err(PushError::Cancelled(item));
        }
        match self.core.mode {
            Mode::Ordered => self.push_ordered(item, wait, token),
            Mode::HotFirst => self.push_hot_first(item, wait, token),
        }
    }

    fn push_ordered(
        &self,
        item: H::Item,
        wait: Wait,
        token: &CancelToken,
    ) -> Result<(), PushError<H::Item>> {
        let core = &*self.core;
        if core.gate.is_some() {
            // A nearly drained cold tier is about to be emptied by the
            // promoter; give it a moment so this item can stay on the hot
            // path. Best effort with a hard bound, correctness never
            // depends on it.
            let backoff = Backoff::new();
            while !backoff.is_completed() {
                match core.cold.len() {
                    Some(n) if n > 0 && n <= core.spin_threshold => backoff.snooze(),
                    _ => break,
                }
            }
        }
        // An item the promoter holds mid-move is in neither tier; while
        // the flag is up, treat the cold tier as non-empty or a fresh push
        // could land in hot ahead of an older item.
        let item = if core.cold.is_empty() && !core.is_migrating() {
            match core.hot.push(item, Wait::NoWait, CancelToken::never()) {
                Ok(()) => {
                    core.take_monitor.pulse();
                    return Ok(());
                }
                Err(PushError::Full(item)) => item,
                Err(e) => return Err(e),
            }
        } else {
            item
        };
        // Overflow must land behind everything already in the cold tier —
        // never in the hot tier — or admission order would be lost.
        core.cold.push(item, wait, token)?;
        core.promote_monitor.pulse();
        core.take_monitor.pulse();
        Ok(())
    }

    fn push_hot_first(
        &self,
        item: H::Item,
        wait: Wait,
        token: &CancelToken,
    ) -> Result<(), PushError<H::Item>> {
        let core = &*self.core;
        let mut item = item;
        // Racing past queued producers would be unfair; take the fast path
        // only when no one is already waiting for space.
        if core.add_monitor.waiter_count() == 0 || wait.is_no_wait() {
            match core.push_now(item) {
                Ok(()) => {
                    core.take_monitor.pulse();
                    return Ok(());
                }
                Err(PushError::Full(rejected)) => item = rejected,
                Err(e) => return Err(e),
            }
        }
        if wait.is_no_wait() {
            return Err(PushError::Full(item));
        }
        let waiter = match core.add_monitor.enter(wait, token) {
            Ok(waiter) => waiter,
            Err(e) => return Err(PushError::from_wait(e, item)),
        };
        loop {
            match core.push_now(item) {
                Ok(()) => {
                    core.take_monitor.pulse();
                    return Ok(());
                }
                Err(PushError::Full(rejected)) => item = rejected,
                Err(e) => return Err(e),
            }
            if core.is_closed() {
                return Err(PushError::Closed(item));
            }
            if waiter.is_timed_out() {
                return Err(PushError::Full(item));
            }
            if let Err(e) = waiter.wait() {
                return Err(PushError::from_wait(e, item));
            }
        }
    }

    /// Pushes without honoring capacity, routed through the mode. Fails
    /// only on a closed queue.
    pub fn push_forced(&self, item: H::Item) -> Result<(), PushError<H::Item>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }
        let core = &*self.core;
        let to_cold = match core.mode {
            Mode::HotFirst => false,
            Mode::Ordered => !core.cold.is_empty() || core.is_migrating(),
        };
        let result = if to_cold {
            core.cold.push_forced(item)
        } else {
            match core.hot.push(item, Wait::NoWait, CancelToken::never()) {
                Err(PushError::Full(item)) => core.cold.push_forced(item),
                other => other,
            }
        };
        if result.is_ok() {
            core.promote_monitor.pulse();
            core.take_monitor.pulse();
        }
        result
    }

    /// Forced push straight into the hot tier, bypassing mode routing.
    /// In `Ordered` mode this jumps the line by design; it exists for
    /// callers restoring an item that already left the queue once.
    pub fn push_forced_hot(&self, item: H::Item) -> Result<(), PushError<H::Item>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }
        self.core.hot.push_forced(item)?;
        self.core.take_monitor.pulse();
        Ok(())
    }

    /// Pops the oldest observable item, hot tier first, waiting up to
    /// `wait` for one to arrive.
    pub fn try_pop(&self, wait: Wait, token: &CancelToken) -> Result<H::Item, PopError> {
        if self.is_closed() {
            return Err(PopError::Closed);
        }
        let core = &*self.core;
        match &core.gate {
            Some(gate) if core.mode == Mode::Ordered => {
                // Hot items are always the oldest, and the promoter only
                // ever appends to the hot tier, so this probe cannot race
                // a move. No gate needed.
                match core.hot.pop(Wait::NoWait, CancelToken::never()) {
                    Ok(item) => {
                        core.add_monitor.pulse();
                        return Ok(item);
                    }
                    Err(PopError::TimedOut) => {}
                    Err(e) => return Err(e),
                }
                // Hot ran dry: the next oldest item may be mid-promotion.
                // Push the promoter out and read a quiesced pair of tiers.
                gate.request_open(Side::Front);
                let _guard = gate.enter(Side::Front, Wait::Forever, token)?;
                self.pop_slow(wait, token)
            }
            _ => {
                if core.take_monitor.waiter_count() == 0 {
                    if let Some(item) = core.pop_now()? {
                        core.add_monitor.pulse();
                        return Ok(item);
                    }
                }
                self.pop_slow(wait, token)
            }
        }
    }

    fn pop_slow(&self, wait: Wait, token: &CancelToken) -> Result<H::Item, PopError> {
        let core = &*self.core;
        if wait.is_no_wait() {
            return match core.pop_now()? {
                Some(item) => {
                    core.add_monitor.pulse();
                    Ok(item)
                }
                None => Err(PopError::TimedOut),
            };
        }
        let waiter = core.take_monitor.enter(wait, token)?;
        loop {
            if let Some(item) = core.pop_now()? {
                core.add_monitor.pulse();
                return Ok(item);
            }
            if core.is_closed() {
                return Err(PopError::Closed);
            }
            if waiter.is_timed_out() {
                return Err(PopError::TimedOut);
            }
            waiter.wait()?;
        }
    }

    /// Shuts the queue down: stops and joins the promoter (restoring any
    /// move in flight), closes both tiers, wakes every blocked caller.
    /// Idempotent; also runs on drop.
    pub fn close(&self) {
        let core = &*self.core;
        if core.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("closing tiered queue");
        core.stop.cancel();
        core.promote_monitor.pulse_all();
        let handle = self.promoter.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        core.hot.close();
        core.cold.close();
        core.add_monitor.pulse_all();
        core.take_monitor.pulse_all();
    }
}

impl<H, C> TieredQueue<H, C>
where
    H: BlockingQueue + 'static,
    C: BlockingQueue<Item = H::Item> + 'static,
{
    /// Composes `hot` over `cold` with a background thread that promotes
    /// cold items into the hot tier whenever consumers are idle.
    pub fn with_promoter(hot: H, cold: C, mode: Mode) -> Self {
        let queue = Self::build(hot, cold, mode, true);
        let core = Arc::clone(&queue.core);
        let handle = std::thread::spawn(move || promote::run(core));
        *queue.promoter.lock() = Some(handle);
        queue
    }
}

impl<H, C> Drop for TieredQueue<H, C>
where
    H: BlockingQueue,
    C: BlockingQueue<Item = H::Item>,
{
    fn drop(&mut self) {
        self.close();
    }
}

impl<H, C> BlockingQueue for TieredQueue<H, C>
where
    H: BlockingQueue,
    C: BlockingQueue<Item = H::Item>,
{
    type Item = H::Item;

    fn push(
        &self,
        item: H::Item,
        wait: Wait,
        token: &CancelToken,
    ) -> Result<(), PushError<H::Item>> {
        self.try_push(item, wait, token)
    }

    fn pop(&self, wait: Wait, token: &CancelToken) -> Result<H::Item, PopError> {
        self.try_pop(wait, token)
    }

    fn push_forced(&self, item: H::Item) -> Result<(), PushError<H::Item>> {
        TieredQueue::push_forced(self, item)
    }

    fn len(&self) -> Option<usize> {
        TieredQueue::len(self)
    }

    fn capacity(&self) -> Option<usize> {
        TieredQueue::capacity(self)
    }

    fn is_empty(&self) -> bool {
        TieredQueue::is_empty(self)
    }

    fn close(&self) {
        TieredQueue::close(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryQueue;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn never() -> &'static CancelToken {
        CancelToken::never()
    }

    fn mem_queue(hot: usize, cold: usize, mode: Mode) -> TieredQueue<MemoryQueue<i32>, MemoryQueue<i32>> {
        TieredQueue::new(MemoryQueue::bounded(hot), MemoryQueue::bounded(cold), mode)
    }

    fn mem_queue_promoted(
        hot: usize,
        cold: usize,
        mode: Mode,
    ) -> TieredQueue<MemoryQueue<i32>, MemoryQueue<i32>> {
        TieredQueue::with_promoter(MemoryQueue::bounded(hot), MemoryQueue::bounded(cold), mode)
    }

    /// Hot-first routing fills the hot tier, spills the rest, and pops the
    /// hot items first.
    #[test]
    fn test_hot_first_routing() {
        let queue = mem_queue(2, 10, Mode::HotFirst);
        for i in 1..=5 {
            queue.try_push(i, Wait::NoWait, never()).unwrap();
        }
        assert_eq!(queue.len(), Some(5));
        assert_eq!(queue.hot().len(), Some(2));
        assert_eq!(queue.cold().len(), Some(3));
        let popped: Vec<_> = (0..5)
            .map(|_| queue.try_pop(Wait::NoWait, never()).unwrap())
            .collect();
        assert_eq!(popped, vec![1, 2, 3, 4, 5]);
    }

    /// Ordered mode without a promoter is strict FIFO across tiers.
    #[test]
    fn test_ordered_fifo() {
        let queue = mem_queue(2, 10, Mode::Ordered);
        for i in 1..=5 {
            queue.try_push(i, Wait::NoWait, never()).unwrap();
        }
        for i in 1..=5 {
            assert_eq!(queue.try_pop(Wait::NoWait, never()).unwrap(), i);
        }
    }

    /// Once the cold tier has items, ordered pushes keep landing behind
    /// them even when the hot tier has room again.
    #[test]
    fn test_ordered_never_jumps_the_line() {
        let queue = mem_queue(2, 10, Mode::Ordered);
        for i in 1..=3 {
            queue.try_push(i, Wait::NoWait, never()).unwrap();
        }
        // 1, 2 sit in hot; 3 spilled. Free a hot slot, then push.
        assert_eq!(queue.try_pop(Wait::NoWait, never()).unwrap(), 1);
        queue.try_push(4, Wait::NoWait, never()).unwrap();
        assert_eq!(queue.hot().len(), Some(1));
        assert_eq!(queue.cold().len(), Some(2));
        for i in 2..=4 {
            assert_eq!(queue.try_pop(Wait::NoWait, never()).unwrap(), i);
        }
    }

    /// Ordered mode stays FIFO with the promoter shoveling underneath.
    #[test]
    fn test_ordered_fifo_with_promoter() {
        let queue = mem_queue_promoted(1, 10, Mode::Ordered);
        for i in 1..=5 {
            queue.try_push(i, Wait::NoWait, never()).unwrap();
        }
        thread::sleep(Duration::from_millis(50));
        for i in 1..=5 {
            assert_eq!(queue.try_pop(Wait::Forever, never()).unwrap(), i);
        }
        assert!(queue.is_empty());
    }

    /// FIFO holds when pops interleave with promotions and preemptions.
    #[test]
    fn test_ordered_fifo_under_preemption() {
        let queue = mem_queue_promoted(1, 10, Mode::Ordered);
        for i in 1..=3 {
            queue.try_push(i, Wait::NoWait, never()).unwrap();
        }
        for i in 1..=3 {
            assert_eq!(queue.try_pop(Wait::Forever, never()).unwrap(), i);
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// A move interrupted by close is force-landed in the hot tier, not
    /// dropped.
    #[test]
    fn test_promotion_interrupted_by_close_is_lossless() {
        let queue = mem_queue_promoted(1, 10, Mode::Ordered);
        queue.try_push(1, Wait::NoWait, never()).unwrap();
        queue.try_push(2, Wait::NoWait, never()).unwrap();
        queue.try_push(3, Wait::NoWait, never()).unwrap();
        // The promoter now holds 2, blocked on the full hot tier.
        thread::sleep(Duration::from_millis(150));
        queue.close();
        // 1 was in hot, 2 was restored next to it, 3 never left cold.
        assert_eq!(queue.hot().len(), Some(2));
        assert_eq!(queue.cold().len(), Some(1));
    }

    /// A consumer cancelled mid-take loses nothing: every admitted item
    /// still comes out, in order, no matter where the promoter was.
    #[test]
    fn test_cancelled_pop_loses_nothing() {
        let queue = mem_queue_promoted(1, 1, Mode::Ordered);
        queue.try_push(1, Wait::NoWait, never()).unwrap();
        queue.try_push(2, Wait::NoWait, never()).unwrap();

        let token = CancelToken::new();
        let t = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            t.cancel();
        });
        let first = queue.try_pop(Wait::Forever, &token);
        canceller.join().unwrap();

        let mut seen = Vec::new();
        if let Ok(item) = first {
            seen.push(item);
        }
        while let Ok(item) = queue.try_pop(Wait::For(Duration::from_millis(200)), never()) {
            seen.push(item);
        }
        assert_eq!(seen, vec![1, 2]);
    }

    /// With a zero-capacity hot tier, everything flows through cold in
    /// order.
    #[test]
    fn test_zero_capacity_hot() {
        let queue = mem_queue(0, 10, Mode::HotFirst);
        for i in 1..=4 {
            queue.try_push(i, Wait::NoWait, never()).unwrap();
        }
        assert_eq!(queue.hot().len(), Some(0));
        assert_eq!(queue.cold().len(), Some(4));
        for i in 1..=4 {
            assert_eq!(queue.try_pop(Wait::NoWait, never()).unwrap(), i);
        }
    }

    /// Closing unblocks a parked consumer and has the promoter joined by
    /// the time it returns.
    #[test]
    fn test_close_unblocks_consumer() {
        let queue = Arc::new(mem_queue_promoted(2, 10, Mode::Ordered));
        assert!(queue.has_promoter());
        let q = queue.clone();
        let consumer = thread::spawn(move || q.try_pop(Wait::Forever, never()));
        thread::sleep(Duration::from_millis(50));
        let start = Instant::now();
        queue.close();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(consumer.join().unwrap(), Err(PopError::Closed));
    }

    /// Closing twice is fine; everything afterwards reports closed.
    #[test]
    fn test_close_is_idempotent() {
        let queue = mem_queue(2, 2, Mode::HotFirst);
        queue.try_push(1, Wait::NoWait, never()).unwrap();
        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert!(
            queue
                .try_push(2, Wait::NoWait, never())
                .unwrap_err()
                .is_closed()
        );
        assert_eq!(queue.try_pop(Wait::NoWait, never()), Err(PopError::Closed));
        assert_eq!(queue.push_forced_hot(3).unwrap_err().into_inner(), 3);
    }

    /// A zero-wait push fails exactly when both tiers are full.
    #[test]
    fn test_full_when_both_tiers_full() {
        let queue = mem_queue(1, 1, Mode::HotFirst);
        queue.try_push(1, Wait::NoWait, never()).unwrap();
        queue.try_push(2, Wait::NoWait, never()).unwrap();
        let err = queue.try_push(3, Wait::NoWait, never()).unwrap_err();
        assert!(err.is_full());
        assert_eq!(err.into_inner(), 3);
    }

    /// Count and capacity are the sums of the tiers; an unbounded tier
    /// makes the whole queue unbounded.
    #[test]
    fn test_size_additivity() {
        let queue = mem_queue(2, 8, Mode::HotFirst);
        assert_eq!(queue.capacity(), Some(10));
        for i in 0..4 {
            queue.try_push(i, Wait::NoWait, never()).unwrap();
        }
        assert_eq!(queue.len(), Some(4));

        let unbounded = TieredQueue::new(
            MemoryQueue::<i32>::bounded(2),
            MemoryQueue::<i32>::unbounded(),
            Mode::HotFirst,
        );
        assert_eq!(unbounded.capacity(), None);
    }

    /// Forced pushes never report full, and in ordered mode they respect
    /// admission order.
    #[test]
    fn test_forced_push_over_capacity() {
        let queue = mem_queue(1, 1, Mode::Ordered);
        queue.try_push(1, Wait::NoWait, never()).unwrap();
        queue.try_push(2, Wait::NoWait, never()).unwrap();
        queue.push_forced(3).unwrap();
        assert_eq!(queue.len(), Some(3));
        for i in 1..=3 {
            assert_eq!(queue.try_pop(Wait::NoWait, never()).unwrap(), i);
        }
    }

    /// The hot-tier escape hatch bypasses routing even in ordered mode.
    #[test]
    fn test_forced_hot_bypasses_routing() {
        let queue = mem_queue(1, 10, Mode::Ordered);
        queue.try_push(1, Wait::NoWait, never()).unwrap();
        queue.try_push(2, Wait::NoWait, never()).unwrap();
        queue.push_forced_hot(99).unwrap();
        assert_eq!(queue.hot().len(), Some(2));
        assert_eq!(queue.try_pop(Wait::NoWait, never()).unwrap(), 1);
        assert_eq!(queue.try_pop(Wait::NoWait, never()).unwrap(), 99);
    }

    /// A tripped token unblocks a parked consumer well within the poll
    /// period.
    #[test]
    fn test_cancel_is_prompt() {
        let queue = Arc::new(mem_queue(2, 2, Mode::HotFirst));
        let token = CancelToken::new();
        let (q, t) = (queue.clone(), token.clone());
        let consumer = thread::spawn(move || {
            let start = Instant::now();
            let res = q.try_pop(Wait::Forever, &t);
            (res, start.elapsed())
        });
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        let (res, elapsed) = consumer.join().unwrap();
        assert_eq!(res, Err(PopError::Cancelled));
        assert!(elapsed < crate::monitor::POLL_PERIOD, "took {elapsed:?}");
    }

    /// With consumers idle and room up top, the promoter empties the cold
    /// tier on its own.
    #[test]
    fn test_promoter_drains_cold() {
        let queue = mem_queue_promoted(2, 10, Mode::Ordered);
        for i in 1..=4 {
            queue.try_push(i, Wait::NoWait, never()).unwrap();
        }
        // 1, 2 in hot; 3, 4 in cold. Free a slot and stand back.
        assert_eq!(queue.try_pop(Wait::Forever, never()).unwrap(), 1);
        let deadline = Instant::now() + Duration::from_secs(2);
        while !queue.cold().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(queue.cold().is_empty());
        for i in 2..=4 {
            assert_eq!(queue.try_pop(Wait::Forever, never()).unwrap(), i);
        }
    }

    /// A producer blocked on a full queue resumes once a consumer makes
    /// room.
    #[test]
    fn test_blocked_push_resumes() {
        let queue = Arc::new(mem_queue(1, 1, Mode::HotFirst));
        queue.try_push(1, Wait::NoWait, never()).unwrap();
        queue.try_push(2, Wait::NoWait, never()).unwrap();
        let q = queue.clone();
        let consumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            q.try_pop(Wait::NoWait, never()).unwrap()
        });
        queue
            .try_push(3, Wait::For(Duration::from_secs(5)), never())
            .unwrap();
        consumer.join().unwrap();
        assert_eq!(queue.len(), Some(2));
    }

    /// Concurrent producers and consumers neither lose nor duplicate
    /// items.
    #[test]
    fn test_no_loss_under_contention() {
        let queue = Arc::new(mem_queue_promoted(4, 64, Mode::Ordered));
        let total = 200;
        let q = queue.clone();
        let producer = thread::spawn(move || {
            for i in 0..total {
                q.try_push(i, Wait::Forever, never()).unwrap();
            }
        });
        let mut seen = Vec::with_capacity(total as usize);
        for _ in 0..total {
            seen.push(queue.try_pop(Wait::Forever, never()).unwrap());
        }
        producer.join().unwrap();
        let expected: Vec<_> = (0..total).collect();
        assert_eq!(seen, expected);
        assert!(queue.is_empty());
    }

    /// A tiered queue can itself be a tier.
    #[test]
    fn test_nested_composition() {
        let inner = TieredQueue::new(
            MemoryQueue::<i32>::bounded(2),
            MemoryQueue::<i32>::bounded(8),
            Mode::HotFirst,
        );
        let outer = TieredQueue::new(MemoryQueue::bounded(1), inner, Mode::HotFirst);
        for i in 1..=5 {
            outer.try_push(i, Wait::NoWait, never()).unwrap();
        }
        assert_eq!(outer.len(), Some(5));
        let mut popped: Vec<_> = (0..5)
            .map(|_| outer.try_pop(Wait::NoWait, never()).unwrap())
            .collect();
        popped.sort_unstable();
        assert_eq!(popped, vec![1, 2, 3, 4, 5]);
    }
}
