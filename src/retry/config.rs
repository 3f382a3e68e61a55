//! Plain-data retry configuration.
//!
//! [`RetryConfig`] is what you put in a config file. It carries no predicate
//! and is not validated until it is turned into a [`RetryPolicy`].
//!
//! With the `serde` feature it can be deserialized, and missing fields fall
//! back to the defaults:
//!
//! ```rust,ignore
//! use retrier::RetryConfig;
//!
//! let config: RetryConfig = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
//! let policy = config.into_policy::<std::io::Error>().unwrap();
//! assert_eq!(policy.max_attempts(), 5);
//! ```

use std::time::Duration;

use super::error::PolicyError;
use super::policy::{
    RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_JITTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
    DEFAULT_MULTIPLIER,
};

/// Serializable retry settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryConfig {
    /// Maximum number of invocations; `0` means unbounded.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    ///
    /// Converting from a [`RetryPolicy`] rounds up to whole milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Jitter fraction in `[0, 1)`.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: millis_ceil(DEFAULT_BASE_DELAY),
            max_delay_ms: millis_ceil(DEFAULT_MAX_DELAY),
            multiplier: DEFAULT_MULTIPLIER,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl RetryConfig {
    /// Validate the settings and build a policy that retries every error.
    ///
    /// Narrow the predicate with [`into_builder`](RetryConfig::into_builder)
    /// instead when some errors are permanent.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] if a setting is out of range.
    pub fn into_policy<E: 'static>(self) -> Result<RetryPolicy<E>, PolicyError> {
        self.into_builder().build()
    }

    /// Start a policy builder preloaded with these settings.
    pub fn into_builder<E: 'static>(self) -> super::policy::RetryPolicyBuilder<E> {
        RetryPolicy::builder(self.max_attempts)
            .base_delay(Duration::from_millis(self.base_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .multiplier(self.multiplier)
            .jitter(self.jitter)
    }
}

/// Whole milliseconds, rounded up and saturating at `u64::MAX`.
///
/// Rounding up keeps a sub-millisecond delay non-zero and preserves
/// `base <= max`, so the result always converts back into a valid policy.
fn millis_ceil(d: Duration) -> u64 {
    u64::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(u64::MAX)
}

/// Delays are rounded up to whole milliseconds.
impl<E> From<&RetryPolicy<E>> for RetryConfig {
    fn from(policy: &RetryPolicy<E>) -> Self {
        let backoff = policy.backoff();
        Self {
            max_attempts: policy.max_attempts(),
            base_delay_ms: millis_ceil(backoff.base_delay()),
            max_delay_ms: millis_ceil(backoff.max_delay()),
            multiplier: backoff.multiplier(),
            jitter: backoff.jitter(),
        }
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_default_config_builds_default_policy() {
        let policy = RetryConfig::default().into_policy::<String>().unwrap();
        let default = RetryPolicy::<String>::default();

        assert_eq!(policy.max_attempts(), default.max_attempts());
        assert_eq!(policy.backoff(), default.backoff());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RetryConfig {
            base_delay_ms: 0,
            ..RetryConfig::default()
        };
        assert_eq!(
            config.into_policy::<()>().unwrap_err(),
            PolicyError::ZeroBaseDelay
        );
    }

    #[test]
    fn test_into_builder_accepts_predicate() {
        let policy = RetryConfig::default()
            .into_builder::<i32>()
            .retryable(|e| *e == 503)
            .build()
            .unwrap();

        assert!(policy.should_retry(&503));
        assert!(!policy.should_retry(&404));
    }

    #[test]
    fn test_from_policy() {
        let policy = RetryPolicy::<()>::builder(7)
            .base_delay(Duration::from_millis(25))
            .max_delay(Duration::from_secs(3))
            .multiplier(1.5)
            .jitter(0.2)
            .build()
            .unwrap();

        let config = RetryConfig::from(&policy);
        assert_eq!(
            config,
            RetryConfig {
                max_attempts: 7,
                base_delay_ms: 25,
                max_delay_ms: 3_000,
                multiplier: 1.5,
                jitter: 0.2,
            }
        );
    }

    #[test]
    fn test_from_policy_rounds_sub_millisecond_delays_up() {
        let policy = RetryPolicy::<()>::builder(3)
            .base_delay(Duration::from_micros(500))
            .max_delay(Duration::from_micros(1_500))
            .build()
            .unwrap();

        let config = RetryConfig::from(&policy);
        assert_eq!(config.base_delay_ms, 1);
        assert_eq!(config.max_delay_ms, 2);

        let rebuilt = config.into_policy::<()>().unwrap();
        assert_eq!(rebuilt.backoff().base_delay(), Duration::from_millis(1));
        assert_eq!(rebuilt.backoff().max_delay(), Duration::from_millis(2));
    }

    #[test]
    fn test_millis_ceil() {
        assert_eq!(millis_ceil(Duration::ZERO), 0);
        assert_eq!(millis_ceil(Duration::from_nanos(1)), 1);
        assert_eq!(millis_ceil(Duration::from_millis(100)), 100);
        assert_eq!(millis_ceil(Duration::MAX), u64::MAX);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_partial_document() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_attempts": 0, "jitter": 0.0}"#).unwrap();

        assert_eq!(config.max_attempts, 0);
        assert_eq!(config.jitter, 0.0);
        assert_eq!(config.base_delay_ms, 100);

        let policy = config.into_policy::<()>().unwrap();
        assert!(policy.is_unbounded());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize_round_trip() {
        let config = RetryConfig {
            max_attempts: 4,
            ..RetryConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RetryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
