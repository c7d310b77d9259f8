use crate::primitives::Timestamp;

/// Source of the current time for every time window check.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Saturates instead of wrapping for dates past 2106.
        chrono::Utc::now()
            .timestamp()
            .clamp(0, i64::from(Timestamp::MAX)) as Timestamp
    }
}
