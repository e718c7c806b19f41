//! Circuit breaker guarding the text extraction backend

use std::time::{Duration, Instant};

/// Observable breaker phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerPhase {
    /// Healthy, calls pass through
    Closed,
    /// Backend assumed down, calls rejected
    Open,
    /// Reset timeout elapsed, trial calls pass
    HalfOpen,
}

/// Failure-counting circuit breaker
///
/// Once the failure threshold is reached, every further failure re-stamps
/// `opened_at`, sliding the open window forward. The breaker only returns to
/// closed through `record_success`.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    failures: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures and admits trial calls once `reset_timeout` has elapsed
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            failures: 0,
            opened_at: None,
        }
    }

    /// Whether a call may proceed (closed or half-open)
    pub fn allow(&self) -> bool {
        match self.opened_at {
            None => true,
            Some(opened_at) => opened_at.elapsed() >= self.reset_timeout,
        }
    }

    /// Record a successful backend call, fully resetting to closed
    pub fn record_success(&mut self) {
        self.failures = 0;
        self.opened_at = None;
    }

    /// Record a failed backend call
    pub fn record_failure(&mut self) {
        self.failures += 1;
        if self.failures >= self.failure_threshold {
            self.opened_at = Some(Instant::now());
        }
    }

    /// Current phase, for logs and diagnostics
    pub fn phase(&self) -> BreakerPhase {
        match self.opened_at {
            None => BreakerPhase::Closed,
            Some(opened_at) if opened_at.elapsed() >= self.reset_timeout => BreakerPhase::HalfOpen,
            Some(_) => BreakerPhase::Open,
        }
    }

    /// Consecutive failures since the last success
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_closed_below_threshold() {
        let mut b = CircuitBreaker::new(5, Duration::from_secs(1));
        for _ in 0..4 {
            b.record_failure();
            assert!(b.allow());
            assert_eq!(b.phase(), BreakerPhase::Closed);
        }
    }

    #[test]
    fn opens_at_threshold() {
        let mut b = CircuitBreaker::new(5, Duration::from_secs(1));
        for _ in 0..5 {
            b.record_failure();
        }
        assert!(!b.allow());
        assert_eq!(b.phase(), BreakerPhase::Open);
    }

    #[test]
    fn half_open_after_reset_timeout() {
        let mut b = CircuitBreaker::new(2, Duration::from_millis(40));
        b.record_failure();
        b.record_failure();
        assert!(!b.allow());

        std::thread::sleep(Duration::from_millis(60));
        assert!(b.allow());
        assert_eq!(b.phase(), BreakerPhase::HalfOpen);
    }

    #[test]
    fn failures_past_threshold_slide_the_open_window() {
        let mut b = CircuitBreaker::new(2, Duration::from_millis(80));
        b.record_failure();
        b.record_failure();

        // Wait out part of the window, then fail again: the window restarts
        // from the most recent failure, not the first one.
        std::thread::sleep(Duration::from_millis(50));
        b.record_failure();
        std::thread::sleep(Duration::from_millis(50));
        assert!(!b.allow(), "window must be anchored to the latest failure");

        std::thread::sleep(Duration::from_millis(40));
        assert!(b.allow());
    }

    #[test]
    fn single_success_fully_resets() {
        let mut b = CircuitBreaker::new(3, Duration::from_secs(60));
        for _ in 0..7 {
            b.record_failure();
        }
        assert!(!b.allow());

        b.record_success();
        assert!(b.allow());
        assert_eq!(b.phase(), BreakerPhase::Closed);
        assert_eq!(b.failures(), 0);

        // threshold counting starts over after a reset
        b.record_failure();
        b.record_failure();
        assert!(b.allow());
    }
}
