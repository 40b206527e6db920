//! The clock module holds the L1 clock used for all chess clock calculations.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// The [ClockReader] trait provides the current time from the perspective of a chain.
pub trait ClockReader: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// The [L1Clock] tracks the timestamp of the latest L1 block. Chess clocks are compared against
/// on-chain state, so they must use the chain's notion of time rather than the local wall clock.
#[derive(Debug, Default)]
pub struct L1Clock {
    timestamp: AtomicU64,
}

impl L1Clock {
    /// Creates a new [L1Clock] starting at the given UNIX timestamp in seconds.
    pub fn new(timestamp: u64) -> Self {
        Self {
            timestamp: AtomicU64::new(timestamp),
        }
    }

    /// Advances the clock to the timestamp of a newer L1 block. Older timestamps are ignored.
    pub fn set_time(&self, timestamp: u64) {
        self.timestamp.fetch_max(timestamp, Ordering::Relaxed);
    }
}

impl ClockReader for L1Clock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.timestamp.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn l1_clock_only_moves_forward() {
        let clock = L1Clock::new(100);
        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(100));

        clock.set_time(160);
        clock.set_time(120);
        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(160));
    }
}
