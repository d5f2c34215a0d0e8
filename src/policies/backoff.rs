//! # Backoff policies between retry attempts.
//!
//! [`BackoffPolicy`] is the contract: each call to
//! [`on_completion`](BackoffPolicy::on_completion) returns the delay to wait
//! before the next attempt and advances the policy's internal counter.
//!
//! [`ExponentialBackoffPolicy`] is parameterized by:
//! - `initial` the first delay;
//! - `maximum` the delay cap;
//! - `scaling` the multiplicative growth factor.
//!
//! The delay for the n-th completion is `initial × scaling^n`, clamped to
//! `maximum`, then jitter is applied. The base is derived purely from the
//! counter, so jitter never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use cloudretry::{BackoffPolicy, ExponentialBackoffPolicy};
//!
//! let mut backoff = ExponentialBackoffPolicy::new(
//!     Duration::from_millis(10),
//!     Duration::from_secs(300),
//!     2.0,
//! );
//!
//! assert_eq!(backoff.on_completion(), Duration::from_millis(10));
//! assert_eq!(backoff.on_completion(), Duration::from_millis(20));
//! assert_eq!(backoff.on_completion(), Duration::from_millis(40));
//! ```

use std::fmt::Debug;
use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Computes successive waits between attempts of one logical operation.
///
/// Instances carry mutable state; the executors clone a fresh instance per
/// logical operation via [`clone_box`](BackoffPolicy::clone_box), so two
/// operations never share a counter.
pub trait BackoffPolicy: Send + Sync + Debug + 'static {
    /// Returns a fresh copy with its state reset to the initial delay.
    fn clone_box(&self) -> Box<dyn BackoffPolicy>;

    /// Returns the delay before the next attempt and advances the policy.
    fn on_completion(&mut self) -> Duration;
}

impl Clone for Box<dyn BackoffPolicy> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Exponentially growing backoff with an upper cap and optional jitter.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialBackoffPolicy {
    initial: Duration,
    maximum: Duration,
    scaling: f64,
    jitter: JitterPolicy,
    completions: u32,
}

impl ExponentialBackoffPolicy {
    /// Creates a policy with the given bounds.
    ///
    /// ### Notes
    /// - `scaling` below `1.0` (or NaN) is raised to `1.0`: delays never shrink.
    /// - `initial` larger than `maximum` yields `maximum` for every call.
    pub fn new(initial: Duration, maximum: Duration, scaling: f64) -> Self {
        let scaling = if scaling.is_nan() || scaling < 1.0 {
            1.0
        } else {
            scaling
        };
        Self {
            initial,
            maximum,
            scaling,
            jitter: JitterPolicy::None,
            completions: 0,
        }
    }

    /// Applies the given jitter strategy to every returned delay.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn maximum(&self) -> Duration {
        self.maximum
    }

    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    /// Computes the un-jittered delay for the given completion number (0-indexed).
    ///
    /// Overflowing or non-finite intermediate values clamp to `maximum`.
    pub fn delay_for(&self, completion: u32) -> Duration {
        let max_secs = self.maximum.as_secs_f64();
        let exp = completion.min(i32::MAX as u32) as i32;
        let unclamped = self.initial.as_secs_f64() * self.scaling.powi(exp);

        if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_secs {
            self.maximum
        } else {
            Duration::from_secs_f64(unclamped)
        }
    }
}

impl BackoffPolicy for ExponentialBackoffPolicy {
    fn clone_box(&self) -> Box<dyn BackoffPolicy> {
        Box::new(Self {
            completions: 0,
            ..*self
        })
    }

    fn on_completion(&mut self) -> Duration {
        let base = self.delay_for(self.completions);
        self.completions = self.completions.saturating_add(1);
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(initial_ms: u64, max: Duration, scaling: f64) -> ExponentialBackoffPolicy {
        ExponentialBackoffPolicy::new(Duration::from_millis(initial_ms), max, scaling)
    }

    #[test]
    fn doubles_until_cap() {
        let mut p = policy(10, Duration::from_secs(300), 2.0);
        let got: Vec<_> = (0..5).map(|_| p.on_completion()).collect();
        assert_eq!(
            got,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40),
                Duration::from_millis(80),
                Duration::from_millis(160),
            ]
        );
    }

    #[test]
    fn never_exceeds_maximum_and_never_decreases() {
        let max = Duration::from_secs(300);
        let mut p = policy(10, max, 2.0);
        let mut prev = Duration::ZERO;
        for _ in 0..64 {
            let d = p.on_completion();
            assert!(d <= max, "{d:?} exceeds cap");
            assert!(d >= prev, "{d:?} < {prev:?}");
            prev = d;
        }
        assert_eq!(prev, max);
    }

    #[test]
    fn constant_when_scaling_is_one() {
        let mut p = policy(500, Duration::from_secs(30), 1.0);
        for _ in 0..10 {
            assert_eq!(p.on_completion(), Duration::from_millis(500));
        }
    }

    #[test]
    fn scaling_below_one_is_raised() {
        let p = policy(100, Duration::from_secs(30), 0.5);
        assert_eq!(p.scaling(), 1.0);
        let nan = policy(100, Duration::from_secs(30), f64::NAN);
        assert_eq!(nan.scaling(), 1.0);
    }

    #[test]
    fn initial_exceeding_maximum_clamps() {
        let mut p = ExponentialBackoffPolicy::new(Duration::from_secs(10), Duration::from_secs(5), 2.0);
        assert_eq!(p.on_completion(), Duration::from_secs(5));
    }

    #[test]
    fn huge_counter_clamps_to_maximum() {
        let p = policy(100, Duration::from_secs(60), 2.0);
        assert_eq!(p.delay_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn clone_box_resets_state() {
        let mut p = policy(10, Duration::from_secs(1), 2.0);
        p.on_completion();
        p.on_completion();
        let mut fresh = p.clone_box();
        assert_eq!(fresh.on_completion(), Duration::from_millis(10));
        assert_eq!(p.on_completion(), Duration::from_millis(40));
    }

    #[test]
    fn jitter_stays_under_base() {
        let mut p = policy(100, Duration::from_secs(30), 2.0).with_jitter(JitterPolicy::Full);
        for n in 0..10 {
            let base = Duration::from_millis(100 * 2u64.pow(n));
            assert!(p.on_completion() <= base);
        }
    }
}
