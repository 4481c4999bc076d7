//! Circuit breaker
//!
//! Explicit breaker state for outbound call sites. The breaker is a plain
//! injectable object: callers ask for permission, run the call themselves and
//! report the outcome, so the guarded path is visible at the call site rather
//! than hidden behind a proxy.
//!
//! States:
//! - CLOSED: calls flow; outcomes fill a count-based sliding window. When the
//!   window holds at least `minimum_calls` outcomes and the failure rate
//!   reaches `failure_rate_threshold` percent, the breaker opens.
//! - OPEN: calls are rejected until `open_wait` has elapsed, then the next
//!   permit moves the breaker to HALF_OPEN.
//! - HALF_OPEN: a bounded number of probe calls run; `half_open_probes`
//!   consecutive successes close the breaker, any failure reopens it.

use mobi_core::config::BreakerConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "CLOSED"),
            BreakerState::Open => write!(f, "OPEN"),
            BreakerState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

struct BreakerInner {
    state: BreakerState,
    /// Outcomes of the most recent calls, true = success
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    probe_successes: u32,
    probes_in_flight: u32,
}

/// Count-based sliding window circuit breaker.
///
/// Thread-safe; shared process-wide as `Arc<CircuitBreaker>`.
pub struct CircuitBreaker {
    name: String,
    failure_rate_threshold: u32,
    sliding_window_size: usize,
    minimum_calls: usize,
    open_wait: Duration,
    half_open_probes: u32,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker from configuration
    pub fn new(name: &str, config: &BreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            failure_rate_threshold: config.failure_rate_threshold,
            sliding_window_size: config.sliding_window_size,
            minimum_calls: config.minimum_calls,
            open_wait: Duration::from_secs(config.open_wait_secs),
            half_open_probes: config.half_open_probes,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                window: VecDeque::new(),
                opened_at: None,
                probe_successes: 0,
                probes_in_flight: 0,
            }),
        }
    }

    /// Breaker name, used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    /// Ask for permission to run a call.
    ///
    /// Returns false when the circuit is open (or half-open with all probe
    /// slots taken); the caller must then use its fallback.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();

        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.open_wait {
                    info!("Breaker {} moving to HALF_OPEN after {:?}", self.name, elapsed);
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_successes = 0;
                    inner.probes_in_flight = 1;
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => {
                if inner.probes_in_flight < self.half_open_probes {
                    inner.probes_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Report a successful call
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();

        match inner.state {
            BreakerState::Closed => {
                Self::push_outcome(&mut inner.window, self.sliding_window_size, true);
            }
            BreakerState::HalfOpen => {
                inner.probe_successes += 1;
                inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
                if inner.probe_successes >= self.half_open_probes {
                    info!("Breaker {} closing after successful probes", self.name);
                    inner.state = BreakerState::Closed;
                    inner.window.clear();
                    inner.opened_at = None;
                }
            }
            BreakerState::Open => {}
        }
    }

    /// Report a failed call
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();

        match inner.state {
            BreakerState::Closed => {
                Self::push_outcome(&mut inner.window, self.sliding_window_size, false);

                if inner.window.len() >= self.minimum_calls {
                    let failures = inner.window.iter().filter(|ok| !**ok).count();
                    let rate = failures * 100 / inner.window.len();
                    if rate as u32 >= self.failure_rate_threshold {
                        warn!(
                            "Breaker {} opening: failure rate {}% over {} calls",
                            self.name,
                            rate,
                            inner.window.len()
                        );
                        inner.state = BreakerState::Open;
                        inner.opened_at = Some(Instant::now());
                    }
                }
            }
            BreakerState::HalfOpen => {
                warn!("Breaker {} reopening: probe failed", self.name);
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_successes = 0;
                inner.probes_in_flight = 0;
            }
            BreakerState::Open => {}
        }
    }

    /// Force a state, for tests and operational overrides
    pub fn force_state(&self, state: BreakerState) {
        let mut inner = self.inner.lock();
        inner.state = state;
        inner.window.clear();
        inner.probe_successes = 0;
        inner.probes_in_flight = 0;
        inner.opened_at = match state {
            BreakerState::Open => Some(Instant::now()),
            _ => None,
        };
    }

    fn push_outcome(window: &mut VecDeque<bool>, size: usize, ok: bool) {
        if window.len() == size {
            window.pop_front();
        }
        window.push_back(ok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BreakerConfig {
        BreakerConfig {
            failure_rate_threshold: 50,
            sliding_window_size: 10,
            minimum_calls: 4,
            open_wait_secs: 30,
            half_open_probes: 2,
        }
    }

    #[test]
    fn test_starts_closed() {
        let breaker = CircuitBreaker::new("test", &config());
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.try_acquire());
    }

    #[test]
    fn test_opens_at_failure_rate() {
        let breaker = CircuitBreaker::new("test", &config());

        breaker.record_success();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);

        // 2 failures out of 4 = 50%
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn test_below_minimum_calls_stays_closed() {
        let breaker = CircuitBreaker::new("test", &config());

        breaker.record_failure();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_probe_failure_reopens() {
        let breaker = CircuitBreaker::new("test", &config());
        breaker.force_state(BreakerState::HalfOpen);

        assert!(breaker.try_acquire());
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn test_half_open_probe_successes_close() {
        let breaker = CircuitBreaker::new("test", &config());
        breaker.force_state(BreakerState::HalfOpen);

        assert!(breaker.try_acquire());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        assert!(breaker.try_acquire());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_limits_probes() {
        let breaker = CircuitBreaker::new("test", &config());
        breaker.force_state(BreakerState::HalfOpen);

        assert!(breaker.try_acquire());
        assert!(breaker.try_acquire());
        // Both probe slots taken
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn test_forced_open_rejects() {
        let breaker = CircuitBreaker::new("test", &config());
        breaker.force_state(BreakerState::Open);
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn test_window_slides() {
        let breaker = CircuitBreaker::new("test", &config());

        // Fill the window with successes, then enough failures to flip the
        // rate only once the old successes have slid out
        for _ in 0..10 {
            breaker.record_success();
        }
        for _ in 0..4 {
            breaker.record_failure();
        }
        // 4 failures of 10 = 40%, still closed
        assert_eq!(breaker.state(), BreakerState::Closed);

        breaker.record_failure();
        // 5 of 10 = 50%
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
