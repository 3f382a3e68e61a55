//! Retry policy types and configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::backoff::Backoff;
use super::error::PolicyError;
use super::predicate::{AlwaysRetry, ClosurePredicate, RetryPredicate};

/// Attempt limit used by the convenience [`retry`](crate::retry()) entry point.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
/// Default upper bound on any delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);
/// Default growth factor per attempt.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
/// Default jitter fraction.
pub const DEFAULT_JITTER: f64 = 0.1;

/// An immutable retry policy.
///
/// A policy bundles an attempt limit, a [`Backoff`] schedule, and a
/// [`RetryPredicate`]. It is validated once when built and never changes
/// afterwards, so one policy can be shared by any number of concurrent
/// [`retry`](RetryPolicy::retry) calls. Cloning is cheap.
///
/// # Counting attempts
///
/// `max_attempts` counts every invocation of the operation, the first one
/// included. `max_attempts(3)` runs the operation at most 3 times with at
/// most 2 waits in between. `0` removes the limit.
///
/// # Examples
///
/// ```rust
/// use retrier::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::<std::io::Error>::builder(5)
///     .base_delay(Duration::from_millis(50))
///     .max_delay(Duration::from_secs(2))
///     .build()
///     .unwrap();
///
/// assert_eq!(policy.max_attempts(), 5);
/// assert_eq!(policy.backoff().base_delay(), Duration::from_millis(50));
/// ```
pub struct RetryPolicy<E> {
    max_attempts: u32,
    backoff: Backoff,
    predicate: Arc<dyn RetryPredicate<E>>,
}

/// A single policy setting, applied in order by [`RetryPolicy::new`].
///
/// Later options override earlier ones for the same field.
pub enum RetryOption<E> {
    /// Set the delay before the first retry.
    BaseDelay(Duration),
    /// Set the upper bound on any delay.
    MaxDelay(Duration),
    /// Set the growth factor per attempt.
    Multiplier(f64),
    /// Set the jitter fraction, in `[0, 1)`.
    Jitter(f64),
    /// Set the retryability predicate.
    Retryable(Arc<dyn RetryPredicate<E>>),
}

impl<E> fmt::Debug for RetryOption<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseDelay(d) => f.debug_tuple("BaseDelay").field(d).finish(),
            Self::MaxDelay(d) => f.debug_tuple("MaxDelay").field(d).finish(),
            Self::Multiplier(m) => f.debug_tuple("Multiplier").field(m).finish(),
            Self::Jitter(j) => f.debug_tuple("Jitter").field(j).finish(),
            Self::Retryable(_) => f.write_str("Retryable(..)"),
        }
    }
}

impl<E> RetryOption<E> {
    /// Build a [`RetryOption::Retryable`] from a closure.
    pub fn retryable<F>(predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
        E: 'static,
    {
        Self::Retryable(Arc::new(ClosurePredicate::new(predicate)))
    }
}

/// Builder for [`RetryPolicy`].
///
/// Every setter overwrites the previous value for its field. Nothing is
/// checked until [`build`](RetryPolicyBuilder::build).
pub struct RetryPolicyBuilder<E> {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
    predicate: Arc<dyn RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Build a policy from an attempt limit and an ordered list of options.
    ///
    /// Options not mentioned keep their defaults.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use retrier::{RetryOption, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::<&str>::new(
    ///     3,
    ///     [
    ///         RetryOption::BaseDelay(Duration::from_millis(10)),
    ///         RetryOption::BaseDelay(Duration::from_millis(20)),
    ///         RetryOption::retryable(|e: &&str| *e == "busy"),
    ///     ],
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(policy.backoff().base_delay(), Duration::from_millis(20));
    /// assert!(policy.should_retry(&"busy"));
    /// assert!(!policy.should_retry(&"gone"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] if the resulting settings violate a policy
    /// invariant.
    pub fn new<I>(max_attempts: u32, options: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = RetryOption<E>>,
        E: 'static,
    {
        options
            .into_iter()
            .fold(Self::builder(max_attempts), RetryPolicyBuilder::option)
            .build()
    }

    /// Start building a policy with the given attempt limit and default settings.
    pub fn builder(max_attempts: u32) -> RetryPolicyBuilder<E>
    where
        E: 'static,
    {
        RetryPolicyBuilder {
            max_attempts,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            jitter: DEFAULT_JITTER,
            predicate: Arc::new(AlwaysRetry),
        }
    }

    /// A policy that retries until success, a non-retryable error, or cancellation.
    pub fn unbounded() -> Self
    where
        E: 'static,
    {
        Self::default_with_attempts(0)
    }

    fn default_with_attempts(max_attempts: u32) -> Self
    where
        E: 'static,
    {
        Self {
            max_attempts,
            backoff: Backoff::new(
                DEFAULT_BASE_DELAY,
                DEFAULT_MAX_DELAY,
                DEFAULT_MULTIPLIER,
                DEFAULT_JITTER,
            ),
            predicate: Arc::new(AlwaysRetry),
        }
    }

    /// Maximum number of invocations; `0` means unbounded.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if the policy never gives up on retryable errors.
    pub fn is_unbounded(&self) -> bool {
        self.max_attempts == 0
    }

    /// The backoff schedule.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Ask the policy's predicate whether `error` should be retried.
    pub fn should_retry(&self, error: &E) -> bool {
        self.predicate.should_retry(error)
    }

    /// Returns true if attempt `attempt` (1-based) was the last one allowed.
    pub(crate) fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

impl<E: 'static> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self::default_with_attempts(DEFAULT_MAX_ATTEMPTS)
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<E> RetryPolicyBuilder<E> {
    /// Set the delay before the first retry. Must be non-zero.
    pub fn base_delay(mut self, d: Duration) -> Self {
        self.base_delay = d;
        self
    }

    /// Set the upper bound on any delay. Must be at least the base delay.
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }

    /// Set the growth factor per attempt. Must be finite and at least 1.
    pub fn multiplier(mut self, m: f64) -> Self {
        self.multiplier = m;
        self
    }

    /// Set the jitter fraction. Must be in `[0, 1)`.
    ///
    /// `0.25` spreads each delay uniformly over ±25% of its nominal value.
    pub fn jitter(mut self, fraction: f64) -> Self {
        self.jitter = fraction;
        self
    }

    /// Retry only errors for which `predicate` returns true.
    pub fn retryable<F>(self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
        E: 'static,
    {
        self.retry_predicate(ClosurePredicate::new(predicate))
    }

    /// Retry only errors accepted by `predicate`.
    pub fn retry_predicate<P>(mut self, predicate: P) -> Self
    where
        P: RetryPredicate<E> + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Apply a single [`RetryOption`].
    pub fn option(self, option: RetryOption<E>) -> Self {
        match option {
            RetryOption::BaseDelay(d) => self.base_delay(d),
            RetryOption::MaxDelay(d) => self.max_delay(d),
            RetryOption::Multiplier(m) => self.multiplier(m),
            RetryOption::Jitter(j) => self.jitter(j),
            RetryOption::Retryable(predicate) => Self { predicate, ..self },
        }
    }

    /// Validate the settings and produce the policy.
    ///
    /// # Errors
    ///
    /// Rejects, rather than clamps, any setting outside its documented range.
    pub fn build(self) -> Result<RetryPolicy<E>, PolicyError> {
        if self.base_delay.is_zero() {
            return Err(PolicyError::ZeroBaseDelay);
        }
        if self.max_delay < self.base_delay {
            return Err(PolicyError::MaxDelayBelowBase {
                base: self.base_delay,
                max: self.max_delay,
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(PolicyError::InvalidMultiplier(self.multiplier));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(PolicyError::InvalidJitter(self.jitter));
        }

        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Backoff::new(
                self.base_delay,
                self.max_delay,
                self.multiplier,
                self.jitter,
            ),
            predicate: self.predicate,
        })
    }
}

impl<E> fmt::Debug for RetryPolicyBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicyBuilder")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;
    use crate::retry::predicate::NeverRetry;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::<String>::default();

        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert!(!policy.is_unbounded());
        assert_eq!(policy.backoff().base_delay(), DEFAULT_BASE_DELAY);
        assert_eq!(policy.backoff().max_delay(), DEFAULT_MAX_DELAY);
        assert_eq!(policy.backoff().multiplier(), DEFAULT_MULTIPLIER);
        assert_eq!(policy.backoff().jitter(), DEFAULT_JITTER);
        assert!(policy.should_retry(&"anything".to_string()));
    }

    #[test]
    fn test_builder_defaults_match_default_policy() {
        let built = RetryPolicy::<String>::builder(DEFAULT_MAX_ATTEMPTS)
            .build()
            .unwrap();
        let default = RetryPolicy::<String>::default();

        assert_eq!(built.max_attempts(), default.max_attempts());
        assert_eq!(built.backoff(), default.backoff());
    }

    #[test]
    fn test_unbounded() {
        let policy = RetryPolicy::<()>::unbounded();
        assert_eq!(policy.max_attempts(), 0);
        assert!(policy.is_unbounded());
        assert!(!policy.exhausted(u32::MAX));
    }

    #[test]
    fn test_exhausted_counts_total_invocations() {
        let policy = RetryPolicy::<()>::builder(3).build().unwrap();
        assert!(!policy.exhausted(1));
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
    }

    #[test]
    fn test_options_apply_in_order() {
        let policy = RetryPolicy::<()>::new(
            4,
            [
                RetryOption::MaxDelay(Duration::from_secs(1)),
                RetryOption::Multiplier(3.0),
                RetryOption::Jitter(0.2),
                RetryOption::MaxDelay(Duration::from_secs(2)),
                RetryOption::Jitter(0.0),
            ],
        )
        .unwrap();

        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.backoff().max_delay(), Duration::from_secs(2));
        assert_eq!(policy.backoff().multiplier(), 3.0);
        assert_eq!(policy.backoff().jitter(), 0.0);
    }

    #[test]
    fn test_later_predicate_overrides_earlier() {
        let policy = RetryPolicy::<i32>::new(
            3,
            [
                RetryOption::Retryable(Arc::new(NeverRetry)),
                RetryOption::retryable(|e: &i32| *e > 0),
            ],
        )
        .unwrap();

        assert!(policy.should_retry(&1));
        assert!(!policy.should_retry(&-1));
    }

    #[test]
    fn test_builder_predicate() {
        let policy = RetryPolicy::<i32>::builder(3)
            .retry_predicate(NeverRetry)
            .build()
            .unwrap();
        assert!(!policy.should_retry(&1));
    }

    #[test]
    fn test_rejects_zero_base_delay() {
        let result = RetryPolicy::<()>::builder(3)
            .base_delay(Duration::ZERO)
            .build();
        assert_eq!(result.unwrap_err(), PolicyError::ZeroBaseDelay);
    }

    #[test]
    fn test_rejects_max_below_base() {
        let result = RetryPolicy::<()>::builder(3)
            .base_delay(Duration::from_millis(500))
            .max_delay(Duration::from_millis(100))
            .build();
        assert_eq!(
            result.unwrap_err(),
            PolicyError::MaxDelayBelowBase {
                base: Duration::from_millis(500),
                max: Duration::from_millis(100),
            }
        );
    }

    #[test]
    fn test_accepts_max_equal_to_base() {
        let result = RetryPolicy::<()>::builder(3)
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(100))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_bad_multiplier() {
        for m in [0.5, 0.0, -2.0, f64::NAN, f64::INFINITY] {
            let result = RetryPolicy::<()>::builder(3).multiplier(m).build();
            assert!(
                matches!(result, Err(PolicyError::InvalidMultiplier(_))),
                "multiplier {} accepted",
                m
            );
        }
    }

    #[test]
    fn test_rejects_bad_jitter() {
        for j in [-0.1, 1.0, 1.5, f64::NAN] {
            let result = RetryPolicy::<()>::builder(3).jitter(j).build();
            assert!(
                matches!(result, Err(PolicyError::InvalidJitter(_))),
                "jitter {} accepted",
                j
            );
        }
    }

    #[test]
    fn test_accepts_boundary_values() {
        let result = RetryPolicy::<()>::builder(0)
            .multiplier(1.0)
            .jitter(0.0)
            .build();
        assert!(result.is_ok());

        let result = RetryPolicy::<()>::builder(0).jitter(0.999).build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_policy_is_clone() {
        let policy = RetryPolicy::<()>::builder(3).build().unwrap();
        let cloned = policy.clone();
        assert_eq!(policy.max_attempts(), cloned.max_attempts());
        assert_eq!(policy.backoff(), cloned.backoff());
    }

    #[test]
    fn test_policy_is_debug() {
        let policy = RetryPolicy::<()>::builder(3).build().unwrap();
        let debug = format!("{:?}", policy);
        assert!(debug.contains("RetryPolicy"));
        assert!(debug.contains("max_attempts: 3"));
    }

    #[test]
    fn test_policy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RetryPolicy<std::io::Error>>();
    }
}
