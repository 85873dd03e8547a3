//! Two-tier blocking queues.
//!
//! A [`TieredQueue`] layers a small, fast queue (the "hot" tier) over a
//! large, slow one (the "cold" tier) and exposes them as a single blocking
//! queue with bounded capacity, cancellation tokens, and an optional
//! background thread that promotes items back into the fast tier. The
//! canonical composition is an in-memory queue over an on-disk spill
//! queue: producers rarely touch the disk, consumers rarely wait.
//!
//! ## Pieces
//!
//! | Type | Role |
//! |------|------|
//! | [`BlockingQueue`] | the tier contract: push/pop with waits and tokens |
//! | [`TieredQueue`] | the two-tier composition, [`Mode::Ordered`] or [`Mode::HotFirst`] |
//! | [`MemoryQueue`] | `VecDeque`-backed tier |
//! | [`ChannelQueue`] | [`flume`]-backed tier |
//! | [`PollingMonitor`] | condvar with a bounded poll period |
//! | [`TwoGate`] | preemptible two-sided exclusion (consumers vs. promoter) |
//! | [`CancelToken`] | polled, linkable cancellation |
//!
//! ## Example
//!
//!```
//! use spillway::{CancelToken, MemoryQueue, Mode, TieredQueue, Wait};
//!
//! let queue = TieredQueue::new(
//!     MemoryQueue::bounded(2),
//!     MemoryQueue::bounded(64),
//!     Mode::Ordered,
//! );
//!
//! for i in 0..4 {
//!     queue.try_push(i, Wait::NoWait, CancelToken::never()).unwrap();
//! }
//! // 0 and 1 sit in the hot tier, 2 and 3 spilled — but ordered mode
//! // still pops in admission order.
//! for i in 0..4 {
//!     assert_eq!(queue.try_pop(Wait::NoWait, CancelToken::never()).unwrap(), i);
//! }
//! queue.close();
//! ```
//!
//! Timeouts are data, not errors: a push that runs out of patience hands
//! the item back in [`PushError::Full`], a pop reports
//! [`PopError::TimedOut`]. Cancellation is polled at a bounded grain, so a
//! tripped [`CancelToken`] unblocks its operation promptly without any
//! shared wait handle between the tiers.

mod channel;
mod error;
mod gate;
mod memory;
mod monitor;
mod queue;
mod tiered;
mod token;
mod wait;

pub use channel::ChannelQueue;
pub use error::{PopError, PushError, WaitError};
pub use gate::{GateGuard, Side, TwoGate};
pub use memory::MemoryQueue;
pub use monitor::{POLL_PERIOD, PollingMonitor, Waiter};
pub use queue::BlockingQueue;
pub use tiered::{Mode, TieredQueue};
pub use token::CancelToken;
pub use wait::Wait;
