//! Resilience primitives wrapping the upstream gateways

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{BreakerState, CircuitBreaker, CircuitBreakerConfig};
pub use retry::RetryPolicy;
