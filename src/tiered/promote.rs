//! Background promotion of cold-tier items into the hot tier.
//!
//! A single long-lived thread parks on the back side of the queue's gate
//! and shovels items upward whenever the cold tier has work. Two rules
//! keep it honest:
//!
//! - the `migrating` flag goes up before an item is extracted and comes
//!   down only once the item sits in the hot tier, so ordered pushes never
//!   slip past an item that is momentarily in neither tier;
//! - an extraction can no longer be abandoned: if cancellation lands while
//!   the item is in hand, the item is force-pushed into the hot tier
//!   before the thread yields. A preempting consumer then finds it there,
//!   still in admission order.
//!
//! Cancellation reaches the thread through a linked token with two
//! parents: the queue's stop token (terminate) and the gate guard's
//! preempt token (yield, then come back).

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, trace};

use super::Core;
use crate::{
    error::{PopError, PushError},
    gate::Side,
    queue::BlockingQueue,
    token::CancelToken,
    wait::Wait,
};

/// Promoter thread entry point. Returns when the queue closes.
pub(super) fn run<H, C>(core: Arc<Core<H, C>>)
where
    H: BlockingQueue,
    C: BlockingQueue<Item = H::Item>,
{
    let Some(gate) = core.gate.as_ref() else {
        return;
    };
    trace!("promoter started");
    loop {
        if core.stop.is_cancelled() {
            break;
        }
        let guard = match gate.enter(Side::Back, Wait::Forever, &core.stop) {
            Ok(guard) => guard,
            // Only the stop token can get here; time to go.
            Err(_) => break,
        };
        let linked = core.stop.linked(guard.preempt_token());
        let alive = drain(&core, &linked);
        drop(guard);
        if !alive {
            break;
        }
    }
    trace!("promoter stopped");
}

/// Moves items cold→hot until preempted or stopped. Returns `false` when
/// the queue is done for good.
fn drain<H, C>(core: &Core<H, C>, linked: &CancelToken) -> bool
where
    H: BlockingQueue,
    C: BlockingQueue<Item = H::Item>,
{
    let Ok(waiter) = core.promote_monitor.enter(Wait::Forever, linked) else {
        return true;
    };
    loop {
        // Flag first, then extract: an ordered push that sees the cold
        // tier empty afterwards is guaranteed to also see the flag.
        core.migrating.store(true, Ordering::SeqCst);
        match core.cold.pop(Wait::NoWait, CancelToken::never()) {
            Ok(item) => {
                let landed = land(core, item, linked);
                core.migrating.store(false, Ordering::SeqCst);
                if !landed {
                    return false;
                }
            }
            Err(PopError::TimedOut) => {
                // Nothing to move; park until a push spills cold.
                core.migrating.store(false, Ordering::SeqCst);
                if linked.is_cancelled() || waiter.wait().is_err() {
                    return true;
                }
            }
            Err(_) => {
                core.migrating.store(false, Ordering::SeqCst);
                return false;
            }
        }
        if linked.is_cancelled() {
            return true;
        }
    }
}

/// Puts an extracted item into the hot tier. Returns `false` only when the
/// hot tier is closed underneath us.
fn land<H, C>(core: &Core<H, C>, item: H::Item, linked: &CancelToken) -> bool
where
    H: BlockingQueue,
    C: BlockingQueue<Item = H::Item>,
{
    // The item exists only in this stack frame now, so the zero-wait
    // attempt carries the never token: cancellation must not keep it from
    // landing.
    let item = match core.hot.push(item, Wait::NoWait, CancelToken::never()) {
        Ok(()) => {
            core.take_monitor.pulse();
            return true;
        }
        Err(PushError::Full(item)) => item,
        Err(e) => return restore(core, e.into_inner()),
    };
    // Hot is full; wait for a consumer to make room, but stay preemptible.
    match core.hot.push(item, Wait::Forever, linked) {
        Ok(()) => {
            trace!("promoted item after waiting out a full hot tier");
            core.take_monitor.pulse();
            true
        }
        Err(e) => restore(core, e.into_inner()),
    }
}

/// An interrupted move: the item already left the cold tier, so force it
/// into the hot tier before yielding. Losing it is not an option.
fn restore<H, C>(core: &Core<H, C>, item: H::Item) -> bool
where
    H: BlockingQueue,
    C: BlockingQueue<Item = H::Item>,
{
    debug!("promotion interrupted, restoring item into the hot tier");
    let restored = core.hot.push_forced(item).is_ok();
    core.take_monitor.pulse();
    restored
}
