//! Microsecond-resolution wall-clock time, kept separate from `std::time` so
//! the scheduler can be driven by recorded values in tests.

use core::fmt;
use core::ops;
use std::time::{SystemTime, UNIX_EPOCH};

/// A point in time, as microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(i64);

impl Instant {
    pub const fn from_micros(micros: i64) -> Instant {
        Instant(micros)
    }

    pub fn now() -> Instant {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Instant(since_epoch.as_micros() as i64)
    }

    pub const fn total_micros(&self) -> i64 {
        self.0
    }

    /// Saturating duration from `earlier` to `self`; negative spans clamp to zero,
    /// matching the scheduler's "remain = max(0, deadline - now)" rule.
    pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
        Duration::from_micros((self.0 - earlier.0).max(0))
    }
}

impl ops::Add<Duration> for Instant {
    type Output = Instant;
    fn add(self, rhs: Duration) -> Instant {
        Instant(self.0 + rhs.total_micros())
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:06}s", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

/// A span of time, as microseconds. Never negative: constructors clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub fn from_micros(micros: i64) -> Duration {
        Duration(micros.max(0))
    }

    pub const fn total_micros(&self) -> i64 {
        self.0
    }

    pub fn as_timeval(&self) -> libc::timeval {
        libc::timeval {
            tv_sec: (self.0 / 1_000_000) as libc::time_t,
            tv_usec: (self.0 % 1_000_000) as libc::suseconds_t,
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_since_clamps_to_zero() {
        let earlier = Instant::from_micros(1_000);
        let later = Instant::from_micros(500);
        assert_eq!(later.saturating_duration_since(earlier), Duration::ZERO);
    }

    #[test]
    fn duration_since_is_exact_when_positive() {
        let earlier = Instant::from_micros(1_000);
        let later = Instant::from_micros(1_750);
        assert_eq!(
            later.saturating_duration_since(earlier),
            Duration::from_micros(750)
        );
    }

    #[test]
    fn add_duration_advances_instant() {
        let t = Instant::from_micros(10) + Duration::from_micros(5);
        assert_eq!(t, Instant::from_micros(15));
    }
}
