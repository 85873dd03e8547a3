use crate::{
    error::{PopError, PushError},
    token::CancelToken,
    wait::Wait,
};

/// A bounded blocking queue.
///
/// This is the contract [`TieredQueue`](crate::TieredQueue) consumes from
/// its tiers — any queue that can block on capacity and emptiness
/// qualifies, whether it lives in memory, on disk, or behind a socket.
/// Implementations own their internal locking; the sizing accessors are
/// best-effort snapshots (`None` = unknown/unbounded).
pub trait BlockingQueue: Send + Sync {
    type Item: Send;

    /// Pushes `item`, waiting up to `wait` for free capacity. A queue that
    /// is still full when the wait runs out returns the item inside
    /// [`PushError::Full`].
    fn push(
        &self,
        item: Self::Item,
        wait: Wait,
        token: &CancelToken,
    ) -> Result<(), PushError<Self::Item>>;

    /// Pops the oldest item, waiting up to `wait` for one to arrive.
    fn pop(&self, wait: Wait, token: &CancelToken) -> Result<Self::Item, PopError>;

    /// Pushes `item` without honoring the capacity bound. Must never
    /// report [`PushError::Full`]; may fail only because the queue is
    /// closed.
    fn push_forced(&self, item: Self::Item) -> Result<(), PushError<Self::Item>>;

    /// Number of queued items, `None` when unknown.
    fn len(&self) -> Option<usize>;

    /// Capacity bound, `None` when unbounded.
    fn capacity(&self) -> Option<usize>;

    fn is_empty(&self) -> bool;

    /// Shuts the queue down: wakes blocked callers (they fail with
    /// `Closed`) and rejects subsequent operations. Idempotent. Items
    /// still queued are dropped with the queue itself.
    fn close(&self);
}
