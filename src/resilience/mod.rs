// src/resilience/mod.rs
// The resilience kit: timeouts, circuit breaker, reconnect backoff. A
// process-global immutable singleton set (spec §4.E, §5).

pub mod backoff;
pub mod circuit_breaker;
pub mod timeout;

use circuit_breaker::CircuitBreaker;
use lazy_static::lazy_static;

lazy_static! {
    pub static ref BREAKER: CircuitBreaker = CircuitBreaker::new();
}
