/**
 * DOMAIN LAYER - Clock and ID Sources
 *
 * Time and identity minting behind injectable traits so tests can pin both.
 * Production wiring uses SystemClock + UuidSource; nothing else in the
 * engine reaches for Utc::now() or Uuid::new_v4() directly.
 */

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub trait ClockSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Nanoseconds since epoch; used in payment references and synthesized
    /// idempotency keys where uniqueness per call matters.
    fn now_ns(&self) -> i64 {
        self.now().timestamp_nanos_opt().unwrap_or_else(|| self.now().timestamp_micros() * 1_000)
    }

    /// Milliseconds since epoch; the `iat` granularity of ticket tokens.
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

pub trait IdSource: Send + Sync {
    fn mint(&self) -> Uuid;
}

pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct UuidSource;

impl IdSource for UuidSource {
    fn mint(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_units_line_up() {
        let clock = SystemClock;
        let ns = clock.now_ns();
        let ms = clock.now_ms();
        // now_ns and now_ms read the clock independently; they still have to
        // land within the same second of each other.
        assert!((ns / 1_000_000 - ms).abs() < 1_000);
    }

    #[test]
    fn uuid_source_mints_unique_ids() {
        let ids = UuidSource;
        assert_ne!(ids.mint(), ids.mint());
    }
}
