// src/resilience/circuit_breaker.rs
// Single process-wide circuit breaker protecting every backend call
// (spec §4.E). Adapted from the teacher's per-provider LLM breaker: one
// global state instead of a per-key map, a consecutive-failure count
// instead of a time-windowed failure list, and a fixed reset timeout.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const FAILURE_THRESHOLD: u32 = 5;
const RESET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
enum State {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

impl Default for State {
    fn default() -> Self {
        Self::Closed {
            consecutive_failures: 0,
        }
    }
}

/// Outcome of asking the breaker for permission to make a call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    Admitted,
    Rejected { retry_after_secs: u64 },
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: Arc<Mutex<State>>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Ask whether a backend call may proceed. A `HalfOpen` probe is
    /// admitted exactly once per cooldown — the caller is expected to
    /// report the outcome via `record_success`/`record_failure`.
    pub fn admit(&self) -> Admission {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match *state {
            State::Closed { .. } => Admission::Admitted,
            State::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= RESET_TIMEOUT {
                    info!("circuit half-open, admitting probe request");
                    *state = State::HalfOpen;
                    Admission::Admitted
                } else {
                    let retry_after_secs = (RESET_TIMEOUT - elapsed).as_secs().max(1);
                    Admission::Rejected { retry_after_secs }
                }
            }
            State::HalfOpen => Admission::Rejected {
                retry_after_secs: 0,
            },
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let was_half_open = matches!(*state, State::HalfOpen);
        *state = State::Closed {
            consecutive_failures: 0,
        };
        if was_half_open {
            info!("circuit closed: half-open probe succeeded");
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        match &mut *state {
            State::Closed {
                consecutive_failures,
            } => {
                *consecutive_failures += 1;
                if *consecutive_failures >= FAILURE_THRESHOLD {
                    warn!(
                        consecutive_failures = *consecutive_failures,
                        "circuit open: failure threshold reached"
                    );
                    *state = State::Open { opened_at: now };
                }
            }
            State::HalfOpen => {
                warn!("half-open probe failed, circuit re-opened");
                *state = State::Open { opened_at: now };
            }
            State::Open { .. } => {}
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed_and_admits() {
        let cb = CircuitBreaker::new();
        assert_eq!(cb.admit(), Admission::Admitted);
    }

    #[test]
    fn single_failure_does_not_trip() {
        let cb = CircuitBreaker::new();
        cb.record_failure();
        assert_eq!(cb.admit(), Admission::Admitted);
    }

    #[test]
    fn five_consecutive_failures_trip_the_circuit() {
        let cb = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            cb.record_failure();
        }
        assert!(matches!(cb.admit(), Admission::Rejected { .. }));
    }

    #[test]
    fn success_resets_the_failure_count() {
        let cb = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD - 1 {
            cb.record_failure();
        }
        cb.record_success();
        cb.record_failure();
        assert_eq!(cb.admit(), Admission::Admitted);
    }

    #[test]
    fn open_circuit_transitions_to_half_open_after_reset_timeout() {
        let cb = CircuitBreaker::new();
        {
            let mut state = cb.state.lock().unwrap();
            *state = State::Open {
                opened_at: Instant::now() - RESET_TIMEOUT - Duration::from_secs(1),
            };
        }
        assert_eq!(cb.admit(), Admission::Admitted);
    }

    #[test]
    fn half_open_probe_success_closes_circuit() {
        let cb = CircuitBreaker::new();
        {
            let mut state = cb.state.lock().unwrap();
            *state = State::HalfOpen;
        }
        cb.record_success();
        assert_eq!(cb.admit(), Admission::Admitted);
    }

    #[test]
    fn half_open_probe_failure_reopens_circuit() {
        let cb = CircuitBreaker::new();
        {
            let mut state = cb.state.lock().unwrap();
            *state = State::HalfOpen;
        }
        cb.record_failure();
        assert!(matches!(cb.admit(), Admission::Rejected { .. }));
    }

    #[test]
    fn retry_after_is_bounded_by_reset_timeout() {
        let cb = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            cb.record_failure();
        }
        if let Admission::Rejected { retry_after_secs } = cb.admit() {
            assert!(retry_after_secs <= RESET_TIMEOUT.as_secs());
        } else {
            panic!("expected circuit to be open");
        }
    }
}
