use std::sync::{
    Arc, LazyLock,
    atomic::{AtomicBool, Ordering},
};

use crossbeam_utils::CachePadded;

/// A cloneable cancellation token.
///
/// Cloning is cheap and every clone observes the same flag. Blocking
/// operations in this crate poll their token at a bounded grain, so a
/// trip is observed promptly without any waker plumbing.
///
/// Tokens can be [`linked`](CancelToken::linked): the combined token trips
/// when either parent trips, while cancelling the combined token leaves
/// both parents untouched. This is how the background promoter tells "the
/// queue is closing" apart from "a consumer wants the gate".
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    flag: CachePadded<AtomicBool>,
    parents: Vec<CancelToken>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared token that never trips. Callers must not cancel it; use it
    /// for operations that should run to completion regardless of any
    /// cancellation in flight.
    pub fn never() -> &'static CancelToken {
        static NEVER: LazyLock<CancelToken> = LazyLock::new(CancelToken::new);
        &NEVER
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::Acquire)
            || self.inner.parents.iter().any(CancelToken::is_cancelled)
    }

    /// Returns a token that trips when `self` or `other` trips, or when it
    /// is cancelled itself.
    #[must_use]
    pub fn linked(&self, other: &CancelToken) -> CancelToken {
        CancelToken {
            inner: Arc::new(Inner {
                flag: CachePadded::new(AtomicBool::new(false)),
                parents: vec![self.clone(), other.clone()],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fresh token is live until cancelled; clones share the flag.
    #[test]
    fn test_cancel_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    /// A linked token observes both parents.
    #[test]
    fn test_linked_observes_parents() {
        let a = CancelToken::new();
        let b = CancelToken::new();
        let linked = a.linked(&b);
        assert!(!linked.is_cancelled());
        b.cancel();
        assert!(linked.is_cancelled());
        assert!(!a.is_cancelled());
    }

    /// Cancelling a linked token does not propagate upward.
    #[test]
    fn test_linked_cancel_is_local() {
        let a = CancelToken::new();
        let b = CancelToken::new();
        let linked = a.linked(&b);
        linked.cancel();
        assert!(linked.is_cancelled());
        assert!(!a.is_cancelled());
        assert!(!b.is_cancelled());
    }

    /// The shared never token stays live.
    #[test]
    fn test_never() {
        assert!(!CancelToken::never().is_cancelled());
    }
}
