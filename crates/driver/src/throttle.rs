//! The throttle module holds the [ResponseThrottle], which optionally slows down the agent's
//! responses without ever letting the delay cost it the game on time.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The [DelayDecision] enum is the outcome of a [ResponseThrottle] check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayDecision {
    /// Respond immediately; no delay is configured or too few responses have been made.
    NotRequired,
    /// Respond immediately; the chess clock is already inside the clock extension window.
    InExtension,
    /// Respond immediately; waiting would push the chess clock into the clock extension window.
    WouldEnterExtension,
    /// Wait for the given duration before responding.
    Delay(Duration),
}

/// The [ResponseThrottle] decides whether to wait before submitting a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseThrottle {
    response_delay: Duration,
    response_delay_after: u64,
}

impl ResponseThrottle {
    /// Creates a new [ResponseThrottle] that delays every response after the first
    /// `response_delay_after` successful ones by `response_delay`.
    pub fn new(response_delay: Duration, response_delay_after: u64) -> Self {
        Self {
            response_delay,
            response_delay_after,
        }
    }

    /// Returns the configured delay.
    pub fn response_delay(&self) -> Duration {
        self.response_delay
    }

    /// Returns the number of successful responses after which the delay applies.
    pub fn response_delay_after(&self) -> u64 {
        self.response_delay_after
    }

    /// Returns `true` if a delay may apply after `responses` successful responses. Only then is
    /// it worth fetching the clock extension for [ResponseThrottle::decide].
    pub fn applies(&self, responses: u64) -> bool {
        !self.response_delay.is_zero() && responses >= self.response_delay_after
    }

    /// Decides whether to delay the next response.
    ///
    /// ### Takes
    /// - `responses`: The number of successful responses made so far.
    /// - `accumulated`: The time used on our chess clock, measured against the L1 clock.
    /// - `clock_extension`: The game's clock extension.
    /// - `max_clock_duration`: The game's time budget per side.
    ///
    /// ### Returns
    /// - [DelayDecision::Delay] only if `accumulated + delay <= max_clock_duration - clock_extension`.
    pub fn decide(
        &self,
        responses: u64,
        accumulated: Duration,
        clock_extension: Duration,
        max_clock_duration: Duration,
    ) -> DelayDecision {
        if !self.applies(responses) {
            return DelayDecision::NotRequired;
        }
        let extension_threshold = max_clock_duration.saturating_sub(clock_extension);
        if accumulated > extension_threshold {
            DelayDecision::InExtension
        } else if accumulated.saturating_add(self.response_delay) > extension_threshold {
            DelayDecision::WouldEnterExtension
        } else {
            DelayDecision::Delay(self.response_delay)
        }
    }

    /// Sleeps for `delay` on the system clock unless `cancel` fires first.
    ///
    /// ### Returns
    /// - `true`: The delay elapsed.
    /// - `false`: The delay was cancelled.
    pub async fn wait(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn minutes(m: u64) -> Duration {
        MINUTE * m as u32
    }

    #[test]
    fn no_delay_configured() {
        let throttle = ResponseThrottle::new(Duration::ZERO, 0);
        assert!(!throttle.applies(10));
        assert_eq!(
            throttle.decide(10, Duration::ZERO, MINUTE, minutes(10)),
            DelayDecision::NotRequired
        );
    }

    #[test]
    fn delay_starts_after_threshold() {
        let throttle = ResponseThrottle::new(Duration::from_secs(30), 2);
        assert_eq!(
            throttle.decide(1, Duration::ZERO, MINUTE, minutes(10)),
            DelayDecision::NotRequired
        );
        assert_eq!(
            throttle.decide(2, Duration::ZERO, MINUTE, minutes(10)),
            DelayDecision::Delay(Duration::from_secs(30))
        );
    }

    #[test]
    fn skips_delay_inside_extension() {
        let throttle = ResponseThrottle::new(Duration::from_secs(30), 0);
        // 8m parent clock + 2m since the claim = 10m, past the 9m threshold.
        assert_eq!(
            throttle.decide(0, minutes(10), MINUTE, minutes(10)),
            DelayDecision::InExtension
        );
        assert_eq!(
            throttle.decide(0, minutes(9) + Duration::from_secs(1), MINUTE, minutes(10)),
            DelayDecision::InExtension
        );
    }

    #[test]
    fn skips_delay_that_would_enter_extension() {
        let throttle = ResponseThrottle::new(minutes(3), 0);
        assert_eq!(
            throttle.decide(0, minutes(6), minutes(2), minutes(10)),
            DelayDecision::WouldEnterExtension
        );
    }

    #[test]
    fn delays_when_response_fits_before_extension() {
        let throttle = ResponseThrottle::new(Duration::from_secs(30), 0);
        // 8m parent clock + 20s since the claim + 30s delay = 8m50s, inside the 9m threshold.
        let accumulated = minutes(8) + Duration::from_secs(20);
        assert_eq!(
            throttle.decide(0, accumulated, MINUTE, minutes(10)),
            DelayDecision::Delay(Duration::from_secs(30))
        );
        // Landing exactly on the threshold is still safe.
        assert_eq!(
            throttle.decide(0, minutes(8) + Duration::from_secs(30), MINUTE, minutes(10)),
            DelayDecision::Delay(Duration::from_secs(30))
        );
    }

    #[test]
    fn chosen_delays_never_cross_threshold() {
        let max_clock_duration = minutes(10);
        for extension in [Duration::ZERO, MINUTE, minutes(2), minutes(11)] {
            for delay_secs in [1u64, 30, 90, 600] {
                let throttle = ResponseThrottle::new(Duration::from_secs(delay_secs), 0);
                for accumulated_secs in (0..=700).step_by(10) {
                    let accumulated = Duration::from_secs(accumulated_secs);
                    if let DelayDecision::Delay(delay) =
                        throttle.decide(0, accumulated, extension, max_clock_duration)
                    {
                        assert!(
                            accumulated + delay
                                <= max_clock_duration.saturating_sub(extension)
                        );
                    }
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wait_elapses_on_system_clock() {
        let throttle = ResponseThrottle::new(Duration::from_secs(7_200), 0);
        let start = tokio::time::Instant::now();
        assert!(throttle.wait(throttle.response_delay(), &CancellationToken::new()).await);
        assert_eq!(start.elapsed(), Duration::from_secs(7_200));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_cancellable() {
        let throttle = ResponseThrottle::new(Duration::from_secs(7_200), 0);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        assert!(!throttle.wait(throttle.response_delay(), &cancel).await);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }
}
