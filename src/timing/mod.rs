//! Arm-cycle countdown
//!
//! Built on `tokio::time::Instant` so a paused test runtime drives it.

use std::time::Duration;
use tokio::time::Instant;

/// Countdown started when the engine enters `Arming`
///
/// All remaining-time readings derive from the single start instant.
#[derive(Debug, Clone, Copy)]
pub struct Countdown {
    started: Instant,
    duration: Duration,
}

impl Countdown {
    pub fn start(now: Instant, duration: Duration) -> Self {
        Self {
            started: now,
            duration,
        }
    }

    /// Time elapsed since the countdown started
    #[inline]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    #[inline]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration.saturating_sub(self.elapsed(now))
    }

    /// Remaining time in whole milliseconds, for progress display
    pub fn remaining_ms(&self, now: Instant) -> u64 {
        u64::try_from(self.remaining(now).as_millis()).unwrap_or(u64::MAX)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_progression() {
        let t0 = Instant::now();
        let countdown = Countdown::start(t0, Duration::from_millis(1200));

        assert_eq!(countdown.remaining_ms(t0), 1200);
        assert_eq!(countdown.remaining_ms(t0 + Duration::from_millis(480)), 720);
        assert!(!countdown.is_expired(t0 + Duration::from_millis(1199)));
        assert!(countdown.is_expired(t0 + Duration::from_millis(1200)));
        assert_eq!(countdown.remaining_ms(t0 + Duration::from_secs(5)), 0);
    }

    #[test]
    fn test_instant_before_start_counts_as_zero_elapsed() {
        let t0 = Instant::now() + Duration::from_millis(100);
        let countdown = Countdown::start(t0, Duration::from_millis(500));
        assert_eq!(countdown.elapsed(Instant::now()), Duration::ZERO);
    }
}
