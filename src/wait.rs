use std::time::{Duration, Instant};

/// How long a blocking operation may wait before giving up.
///
/// Timeouts are not failures: a push that runs out of patience gets its
/// item back as [`PushError::Full`](crate::PushError::Full), a pop returns
/// [`PopError::TimedOut`](crate::PopError::TimedOut).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Try exactly once and return immediately.
    NoWait,
    /// Wait up to the given duration.
    For(Duration),
    /// Wait until the operation completes, the queue closes, or the token
    /// trips.
    Forever,
}

impl Wait {
    /// Maps the classic millisecond convention: `0` tries once, negative
    /// waits forever, anything else is a bounded wait.
    pub fn from_millis(ms: i64) -> Self {
        match ms {
            0 => Self::NoWait,
            ms if ms < 0 => Self::Forever,
            ms => Self::For(Duration::from_millis(ms as u64)),
        }
    }

    pub fn is_no_wait(self) -> bool {
        self == Self::NoWait || self == Self::For(Duration::ZERO)
    }

    /// `None` means no deadline.
    pub(crate) fn deadline(self) -> Option<Instant> {
        match self {
            Self::NoWait => Some(Instant::now()),
            // A duration too large for the clock is as good as forever.
            Self::For(d) => Instant::now().checked_add(d),
            Self::Forever => None,
        }
    }
}

impl From<Duration> for Wait {
    fn from(d: Duration) -> Self {
        if d.is_zero() { Self::NoWait } else { Self::For(d) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The millisecond convention maps onto the three variants.
    #[test]
    fn test_from_millis() {
        assert_eq!(Wait::from_millis(0), Wait::NoWait);
        assert_eq!(Wait::from_millis(-1), Wait::Forever);
        assert_eq!(Wait::from_millis(250), Wait::For(Duration::from_millis(250)));
    }

    /// A zero duration counts as "try once".
    #[test]
    fn test_zero_duration_is_no_wait() {
        assert!(Wait::NoWait.is_no_wait());
        assert!(Wait::For(Duration::ZERO).is_no_wait());
        assert!(!Wait::Forever.is_no_wait());
        assert!(!Wait::For(Duration::from_millis(1)).is_no_wait());
    }

    /// Only bounded waits produce a deadline.
    #[test]
    fn test_deadline() {
        assert!(Wait::NoWait.deadline().is_some());
        assert!(Wait::For(Duration::from_secs(1)).deadline().is_some());
        assert!(Wait::Forever.deadline().is_none());
    }
}
