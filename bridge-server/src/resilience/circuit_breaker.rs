//! Failure-counting circuit breaker
//!
//! States: **Closed** (normal, failures counted) → **Open** (threshold
//! reached, calls rejected until the timeout elapses) → **HalfOpen**
//! (one probe call allowed; success closes, failure re-opens).

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Breaker tuning, taken from configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// How long the circuit stays open before allowing a probe
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker guarding one upstream system.
///
/// Mutated from concurrent tasks; the lock is held only for the few
/// instructions of a state check or counter bump.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    /// Gate check before an outbound call.
    ///
    /// Returns `false` while the circuit is open. Once the timeout has
    /// elapsed the breaker moves to half-open and lets the call through
    /// as a probe.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed > self.config.timeout {
                    inner.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != BreakerState::Closed {
            tracing::info!(state = inner.state.as_str(), "circuit breaker closing");
        }
        inner.failure_count = 0;
        inner.state = BreakerState::Closed;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());
        if inner.state == BreakerState::HalfOpen || inner.failure_count >= self.config.failure_threshold
        {
            if inner.state != BreakerState::Open {
                tracing::warn!(
                    failures = inner.failure_count,
                    "circuit breaker opening"
                );
            }
            inner.state = BreakerState::Open;
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }
}
