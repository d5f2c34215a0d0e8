//! # Jitter policy for backoff delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that many clients that
//! failed together do not all retry at the same instant.
//!
//! - [`JitterPolicy::None`] no randomization, predictable delays
//! - [`JitterPolicy::Full`] random delay in [0, delay] (most aggressive)
//! - [`JitterPolicy::Equal`] delay/2 + random[0, delay/2] (balanced)
//!
//! Jitter only ever shortens a delay, so the backoff cap is preserved.

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of backoff delays.
///
/// ## Trade-offs
/// - **None**: Predictable, but risks thundering herd
/// - **Full**: Maximum randomness, aggressive load spreading
/// - **Equal**: Balanced, keeps at least half of the computed delay
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use exact backoff delay.
    #[default]
    None,

    /// Full jitter: random delay in [0, delay].
    Full,

    /// Equal jitter: delay/2 + random[0, delay/2].
    Equal,
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => full_jitter(delay),
            JitterPolicy::Equal => equal_jitter(delay),
        }
    }
}

/// Full jitter: random[0, delay]
fn full_jitter(delay: Duration) -> Duration {
    let ns = as_nanos_saturating(delay);
    if ns == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::rng().random_range(0..=ns))
}

/// Equal jitter: delay/2 + random[0, delay/2]
fn equal_jitter(delay: Duration) -> Duration {
    let ns = as_nanos_saturating(delay);
    let half = ns / 2;
    let upper = ns - half;
    if upper == 0 {
        return Duration::from_nanos(half);
    }
    Duration::from_nanos(half + rand::rng().random_range(0..=upper))
}

fn as_nanos_saturating(d: Duration) -> u64 {
    d.as_nanos().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let d = Duration::from_millis(1234);
        assert_eq!(JitterPolicy::None.apply(d), d);
    }

    #[test]
    fn full_jitter_never_exceeds_input() {
        for _ in 0..100 {
            assert!(JitterPolicy::Full.apply(Duration::from_millis(50)) <= Duration::from_millis(50));
        }
    }

    #[test]
    fn equal_jitter_keeps_half() {
        for _ in 0..100 {
            let d = JitterPolicy::Equal.apply(Duration::from_millis(1000));
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn zero_stays_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn sub_millisecond_delays_keep_their_range() {
        let d = Duration::from_micros(1900);
        let mut above_one_ms = false;
        for _ in 0..200 {
            let j = JitterPolicy::Full.apply(d);
            assert!(j <= d);
            above_one_ms |= j > Duration::from_millis(1);

            let e = JitterPolicy::Equal.apply(d);
            assert!(e >= Duration::from_micros(950) && e <= d, "{e:?}");
        }
        assert!(above_one_ms);
    }
}
