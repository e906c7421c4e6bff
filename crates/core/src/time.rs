use chrono::{DateTime, Duration, Utc};

/// Source of "now" for timers and sessions.
///
/// `Fixed` is used by tests and replays so no test ever waits on real time.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Move a fixed clock forward. No effect on the system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Move a fixed clock forward by whole seconds.
    pub fn advance_secs(&mut self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Whole seconds elapsed from `since` to `now`, zero if `now` is earlier.
#[must_use]
pub fn elapsed_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let secs = now.signed_duration_since(since).num_seconds();
    u64::try_from(secs).unwrap_or(0)
}

/// Render a countdown value as `MM:SS`. Minutes are not wrapped into hours.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(600), "10:00");
        assert_eq!(format_clock(3_725), "62:05");
    }

    #[test]
    fn fixed_clock_advances_but_system_does_not_panic() {
        let mut clock = fixed_clock();
        clock.advance_secs(90);
        assert_eq!(elapsed_secs(fixed_now(), clock.now()), 90);

        let mut system = Clock::system();
        system.advance_secs(5);
        assert!(!system.is_fixed());
    }

    #[test]
    fn elapsed_is_zero_for_backdated_now() {
        let now = fixed_now();
        assert_eq!(elapsed_secs(now, now - Duration::seconds(3)), 0);
    }
}
