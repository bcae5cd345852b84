//! Injectable clock (spec §9: global mutable state — alongside the rate
//! limiter and MCP session cache — "encapsulated behind a small struct with
//! a `Clock` trait for deterministic tests").
//!
//! Grounded on the same shape as [`super::rate_limiter::RateLimiter`] and
//! [`super::session_cache::SessionCache`]: a trait object swapped in at the
//! call site rather than a bare `chrono::Utc::now()` scattered through
//! business logic. Most of the decision functions in this crate (entitlement
//! status checks, webhook skew checks) already take `now` as an explicit
//! argument, which gets them the same testability without a trait; this is
//! reserved for call sites — like the reconciliation worker's scheduling
//! loop — that want to own "now" across an await boundary.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Returns a fixed instant regardless of when it's asked. Used in tests that
/// need to pin "now" relative to seeded period boundaries.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_always_returns_the_same_instant() {
        let at = Utc::now();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), at);
    }

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(clock.now() >= first);
    }
}
