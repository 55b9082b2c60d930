//! Fail-fast guard for the ISS transport.
//!
//! After `failure_threshold` consecutive failures the breaker opens and every
//! request is refused until `open_timeout` has elapsed; the next request is
//! then let through as a trial request. The breaker never retries anything itself.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Circuit {
    Closed { failures: u32 },
    Open { since: Instant },
    Probing,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuit: Mutex<Circuit>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuit: Mutex::new(Circuit::Closed { failures: 0 }),
        }
    }

    fn circuit(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a request may go out now. An expired open circuit lets one trial request through.
    pub fn allow_request(&self) -> bool {
        let mut circuit = self.circuit();
        match *circuit {
            Circuit::Closed { .. } | Circuit::Probing => true,
            Circuit::Open { since } if since.elapsed() >= self.config.open_timeout => {
                *circuit = Circuit::Probing;
                true
            }
            Circuit::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        *self.circuit() = Circuit::Closed { failures: 0 };
    }

    pub fn record_failure(&self) {
        let mut circuit = self.circuit();
        let next = match *circuit {
            Circuit::Closed { failures } => {
                let failures = failures.saturating_add(1);
                if failures >= self.config.failure_threshold {
                    warn!(failures, "iss circuit breaker opened");
                    Circuit::Open {
                        since: Instant::now(),
                    }
                } else {
                    Circuit::Closed { failures }
                }
            }
            Circuit::Probing => {
                warn!("iss trial request failed; circuit breaker re-opened");
                Circuit::Open {
                    since: Instant::now(),
                }
            }
            open @ Circuit::Open { .. } => open,
        };
        *circuit = next;
    }

    pub fn state(&self) -> CircuitState {
        match *self.circuit() {
            Circuit::Closed { .. } => CircuitState::Closed,
            Circuit::Open { .. } => CircuitState::Open,
            Circuit::Probing => CircuitState::HalfOpen,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        match *self.circuit() {
            Circuit::Closed { failures } => failures,
            Circuit::Open { .. } | Circuit::Probing => self.config.failure_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            open_timeout: Duration::from_secs(60),
        });

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 1);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            open_timeout: Duration::from_secs(60),
        });

        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn failed_trial_reopens_immediately() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            open_timeout: Duration::from_millis(1),
        });

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(3));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn successful_trial_closes_circuit() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            open_timeout: Duration::from_millis(1),
        });

        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(3));
        assert!(breaker.allow_request());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }
}
