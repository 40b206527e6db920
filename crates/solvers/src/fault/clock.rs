//! The clock module contains the chess clock model of the fault dispute game.

use super::Claim;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The number of bits occupied by the timestamp in a packed on-chain clock.
const TIMESTAMP_BITS: u32 = 64;

/// The [Clock] struct tracks the chess clock of a given [Claim] within the game.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clock {
    /// The time elapsed on the chess clock at the last update.
    pub duration: Duration,
    /// The UNIX timestamp, in seconds, at which the clock was last updated.
    pub timestamp: u64,
}

impl Clock {
    /// Creates a new [Clock] from an elapsed duration and a UNIX timestamp in seconds.
    pub fn new(duration: Duration, timestamp: u64) -> Self {
        Self {
            duration,
            timestamp,
        }
    }

    /// Decodes a packed on-chain clock. The upper 64 bits hold the elapsed duration in seconds
    /// and the lower 64 bits hold the UNIX timestamp of the last update.
    pub fn decode(packed: u128) -> Self {
        let duration = (packed >> TIMESTAMP_BITS) as u64;
        let timestamp = (packed & u64::MAX as u128) as u64;
        Self::new(Duration::from_secs(duration), timestamp)
    }

    /// Packs the [Clock] into its on-chain representation. Sub-second precision of the
    /// duration is dropped.
    pub fn pack(&self) -> u128 {
        ((self.duration.as_secs() as u128) << TIMESTAMP_BITS) | self.timestamp as u128
    }

    /// Returns the time at which the clock was last updated.
    pub fn updated_at(&self) -> Duration {
        Duration::from_secs(self.timestamp)
    }
}

impl From<u128> for Clock {
    fn from(packed: u128) -> Self {
        Self::decode(packed)
    }
}

/// Computes the time elapsed on the chess clock of the team that disagrees with `claim`: the
/// duration accumulated on the `parent`'s clock plus the time passed since `claim` was posted.
///
/// The root claim has no parent, in which case only the time since it was posted counts.
/// A `now` earlier than the claim's timestamp contributes no elapsed time.
pub fn chess_clock(now: SystemTime, claim: &Claim, parent: Option<&Claim>) -> Duration {
    let now = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let since_claim = now.saturating_sub(claim.clock.updated_at());
    match parent {
        Some(parent) => parent.clock.duration.saturating_add(since_claim),
        None => since_claim,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fault::{ClaimData, ROOT_POSITION};

    fn claim_at(timestamp: u64, duration: Duration) -> Claim {
        Claim {
            data: ClaimData {
                position: ROOT_POSITION,
                ..Default::default()
            },
            clock: Clock::new(duration, timestamp),
            ..Default::default()
        }
    }

    fn unix(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn decode_packed_clock() {
        let clock = Clock::decode(0xa0000000000000005);
        assert_eq!(clock.duration, Duration::from_secs(10));
        assert_eq!(clock.timestamp, 5);

        let clock = Clock::decode(0xa5000000000000001);
        assert_eq!(clock.duration, Duration::from_secs(10));
        assert_eq!(clock.timestamp, 5764607523034234881);
    }

    #[test]
    fn decode_reverses_pack() {
        for (secs, timestamp) in [
            (0, 0),
            (1, 1),
            (3_600, 1_700_000_000),
            (u64::MAX, i64::MAX as u64),
        ] {
            let clock = Clock::new(Duration::from_secs(secs), timestamp);
            assert_eq!(Clock::decode(clock.pack()), clock);
        }
    }

    #[test]
    fn root_clock_is_time_since_posted() {
        let root = claim_at(100, Duration::from_secs(30));
        assert_eq!(chess_clock(unix(160), &root, None), Duration::from_secs(60));
    }

    #[test]
    fn child_clock_includes_parent_duration() {
        let parent = claim_at(100, Duration::from_secs(30));
        let child = claim_at(150, Duration::from_secs(50));
        assert_eq!(
            chess_clock(unix(160), &child, Some(&parent)),
            Duration::from_secs(40)
        );
    }

    #[test]
    fn chess_clock_never_decreases() {
        let parent = claim_at(100, Duration::from_secs(30));
        let child = claim_at(150, Duration::from_secs(50));
        let mut last = Duration::ZERO;
        for now in (0..400).step_by(7) {
            let elapsed = chess_clock(unix(now), &child, Some(&parent));
            assert!(elapsed >= last);
            last = elapsed;
        }
        assert_eq!(
            chess_clock(unix(120), &child, Some(&parent)),
            Duration::from_secs(30)
        );
    }
}
