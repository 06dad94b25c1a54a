use chrono::{DateTime, Duration, Utc};

/// Source of "now" for session start/stop bookkeeping.
///
/// Signal timestamps come from reporters; only lifecycle transitions read the clock.
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

    /// Moves a fixed clock forward. No effect on `Clock::System`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Fractional seconds in a signed duration.
#[must_use]
pub fn duration_secs(delta: Duration) -> f64 {
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// `base` shifted by a fractional number of seconds (millisecond resolution).
#[must_use]
pub fn offset_secs(base: DateTime<Utc>, secs: f64) -> DateTime<Utc> {
    base + Duration::milliseconds((secs * 1_000.0).round() as i64)
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// `fixed_now()` plus `secs` seconds.
#[must_use]
pub fn fixed_at(secs: f64) -> DateTime<Utc> {
    offset_secs(fixed_now(), secs)
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now(), fixed_at(5.0));
    }

    #[test]
    fn duration_secs_keeps_fraction_and_sign() {
        assert_eq!(duration_secs(Duration::milliseconds(2_500)), 2.5);
        assert_eq!(duration_secs(Duration::milliseconds(-750)), -0.75);
    }
}
