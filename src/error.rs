use std::fmt;

use thiserror::Error;

/// Error returned by push operations.
///
/// Every variant carries the rejected item back to the caller, so a failed
/// push never drops data.
#[derive(Error)]
pub enum PushError<T> {
    /// The queue had no free capacity within the allowed wait.
    #[error("queue is full")]
    Full(T),
    /// The cancellation token tripped while waiting.
    #[error("operation was cancelled")]
    Cancelled(T),
    /// The queue has been closed.
    #[error("queue is closed")]
    Closed(T),
}

impl<T> PushError<T> {
    /// Recovers the item that failed to enter the queue.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Cancelled(item) | Self::Closed(item) => item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }

    pub(crate) fn from_wait(e: WaitError, item: T) -> Self {
        match e {
            // Running out of patience means the queue is still full.
            WaitError::TimedOut => Self::Full(item),
            WaitError::Cancelled => Self::Cancelled(item),
        }
    }
}

// Manual impl so `T` does not have to be `Debug`.
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Cancelled(_) => f.write_str("Cancelled(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

/// Error returned by pop operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PopError {
    /// No item arrived within the allowed wait.
    #[error("timed out waiting for an item")]
    TimedOut,
    /// The cancellation token tripped while waiting.
    #[error("operation was cancelled")]
    Cancelled,
    /// The queue has been closed.
    #[error("queue is closed")]
    Closed,
}

/// Error returned by the bare waiting primitives (monitor and gate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("wait timed out")]
    TimedOut,
    #[error("wait was cancelled")]
    Cancelled,
}

impl From<WaitError> for PopError {
    fn from(e: WaitError) -> Self {
        match e {
            WaitError::TimedOut => Self::TimedOut,
            WaitError::Cancelled => Self::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A rejected item survives the round trip through the error.
    #[test]
    fn test_push_error_returns_item() {
        let err = PushError::Full(String::from("payload"));
        assert!(err.is_full());
        assert_eq!(err.into_inner(), "payload");
    }

    /// Wait errors translate to the push vocabulary.
    #[test]
    fn test_from_wait() {
        assert!(PushError::from_wait(WaitError::TimedOut, 1).is_full());
        assert!(PushError::from_wait(WaitError::Cancelled, 1).is_cancelled());
        assert_eq!(PopError::from(WaitError::TimedOut), PopError::TimedOut);
        assert_eq!(PopError::from(WaitError::Cancelled), PopError::Cancelled);
    }
}
