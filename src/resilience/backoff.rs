// src/resilience/backoff.rs
// Full-jitter exponential backoff for peer reconnects (spec §4.E).
//
// The teacher's `utils/rate_limiter.rs` reaches for `governor::Jitter`, but
// that jitter is additive/percentage-based around a fixed quota interval,
// not "uniform on [0, capped_exponential]" — so reconnect backoff gets its
// own small helper instead of reusing governor's.

use rand::Rng;
use std::time::Duration;

const BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(60);

/// `delay(attempt) = uniform(0, min(MAX_DELAY, BASE_DELAY * 2^attempt))`.
pub fn delay(attempt: u32) -> Duration {
    let cap = capped_exponential(attempt);
    if cap.is_zero() {
        return cap;
    }
    let millis = rand::rng().random_range(0..=cap.as_millis() as u64);
    Duration::from_millis(millis)
}

fn capped_exponential(attempt: u32) -> Duration {
    let shift = attempt.min(32);
    let exponential = BASE_DELAY.checked_mul(1u32.checked_shl(shift).unwrap_or(u32::MAX));
    match exponential {
        Some(d) if d < MAX_DELAY => d,
        _ => MAX_DELAY,
    }
}
