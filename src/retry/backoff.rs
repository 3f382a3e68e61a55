//! Exponential backoff with proportional jitter.

use std::time::Duration;

use rand::Rng;

/// Maps a 1-based attempt index to the delay that follows it.
///
/// `Backoff` is plain data. The delay after attempt `n` is
/// `base * multiplier^(n - 1)`, capped at `max`, then perturbed by up to
/// `±jitter` of itself and clamped back into `[0, max]`.
///
/// Construct one through [`RetryPolicy`](crate::RetryPolicy); the policy
/// builder is what enforces the invariants this type relies on.
///
/// # Examples
///
/// ```rust
/// use retrier::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::<()>::builder(5)
///     .base_delay(Duration::from_millis(10))
///     .max_delay(Duration::from_millis(100))
///     .multiplier(2.0)
///     .jitter(0.0)
///     .build()
///     .unwrap();
///
/// let delays: Vec<_> = (1..=5).map(|n| policy.backoff().delay(n)).collect();
/// assert_eq!(
///     delays,
///     [10, 20, 40, 80, 100].map(Duration::from_millis).to_vec()
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
}

impl Backoff {
    pub(crate) fn new(base: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            base,
            max,
            multiplier,
            jitter,
        }
    }

    /// Delay before the first retry.
    pub fn base_delay(&self) -> Duration {
        self.base
    }

    /// Upper bound on any delay.
    pub fn max_delay(&self) -> Duration {
        self.max
    }

    /// Growth factor per attempt.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Fraction of each delay that may be randomized.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// The delay after attempt `attempt`, before jitter.
    ///
    /// Deterministic and non-decreasing in `attempt`. Overflow saturates to
    /// the max delay. Attempt `0` is treated as attempt `1`.
    pub fn capped_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw = self.base.as_nanos() as f64 * self.multiplier.powi(exponent);
        self.clamp_nanos(raw)
    }

    /// The delay after attempt `attempt`, with jitter drawn from the thread RNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with_rng(attempt, &mut rand::rng())
    }

    /// The delay after attempt `attempt`, with jitter drawn from `rng`.
    pub fn delay_with_rng<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let capped = self.capped_delay(attempt);
        if self.jitter == 0.0 {
            return capped;
        }
        let u = rng.random_range(-self.jitter..=self.jitter);
        self.clamp_nanos(capped.as_nanos() as f64 * (1.0 + u))
    }

    fn clamp_nanos(&self, nanos: f64) -> Duration {
        let max = self.max.as_nanos() as f64;
        if nanos.is_nan() || nanos >= max {
            return self.max;
        }
        if nanos <= 0.0 {
            return Duration::ZERO;
        }
        if nanos < u64::MAX as f64 {
            Duration::from_nanos(nanos.round() as u64).min(self.max)
        } else {
            Duration::from_secs_f64(nanos / 1e9).min(self.max)
        }
    }
}
