//! Error types for retry operations.

use std::time::Duration;

use thiserror::Error;

use crate::cancel::CancelReason;

/// Error returned when a retry policy violates its invariants.
///
/// Policies are validated once, when they are built. A policy that exists is
/// always valid, so none of these can surface mid-retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// The base delay was zero.
    #[error("base delay must be greater than zero")]
    ZeroBaseDelay,
    /// The maximum delay was smaller than the base delay.
    #[error("max delay {max:?} is below base delay {base:?}")]
    MaxDelayBelowBase {
        /// Configured base delay.
        base: Duration,
        /// Configured maximum delay.
        max: Duration,
    },
    /// The multiplier was below 1 or not a finite number.
    #[error("multiplier must be a finite number >= 1, got {0}")]
    InvalidMultiplier(f64),
    /// The jitter fraction was outside `[0, 1)`.
    #[error("jitter must be in [0, 1), got {0}")]
    InvalidJitter(f64),
}

/// Error returned by the retry executor.
///
/// Exhaustion is not wrapped in a marker: an operation error that ends the
/// loop is returned unchanged whether it was non-retryable or the last of a
/// bounded run. Consult the predicate to tell the two apart.
///
/// # Examples
///
/// ```rust
/// use retrier::{Context, RetryError, RetryPolicy};
///
/// # tokio_test::block_on(async {
/// let ctx = Context::background();
/// let policy = RetryPolicy::builder(1).build().unwrap();
///
/// let result = policy
///     .retry(&ctx, |_| async { Err::<(), _>("boom") })
///     .await;
///
/// assert_eq!(result, Err(RetryError::Operation("boom")));
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError<E> {
    /// The operation failed and no further attempt will be made.
    #[error("{0}")]
    Operation(E),
    /// The cancellation signal fired before a new attempt could start.
    #[error(transparent)]
    Cancelled(CancelReason),
}

impl<E> RetryError<E> {
    /// Returns true if the loop ended because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// The cancellation reason, if the loop was cancelled.
    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            Self::Cancelled(reason) => Some(*reason),
            Self::Operation(_) => None,
        }
    }

    /// Get a reference to the operation error, if any.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            Self::Cancelled(_) => None,
        }
    }

    /// Extract the operation error, discarding a cancellation.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            Self::Cancelled(_) => None,
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_policy_error_display() {
        let err = PolicyError::MaxDelayBelowBase {
            base: Duration::from_millis(200),
            max: Duration::from_millis(100),
        };
        let display = err.to_string();
        assert!(display.contains("200ms"));
        assert!(display.contains("100ms"));

        assert!(PolicyError::InvalidJitter(1.5).to_string().contains("1.5"));
    }

    #[test]
    fn test_retry_error_operation() {
        let err: RetryError<&str> = RetryError::Operation("connection refused");
        assert!(!err.is_cancelled());
        assert_eq!(err.cancel_reason(), None);
        assert_eq!(err.operation_error(), Some(&"connection refused"));
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.into_operation_error(), Some("connection refused"));
    }

    #[test]
    fn test_retry_error_cancelled() {
        let err: RetryError<String> = RetryError::Cancelled(CancelReason::DeadlineExceeded);
        assert!(err.is_cancelled());
        assert_eq!(err.cancel_reason(), Some(CancelReason::DeadlineExceeded));
        assert_eq!(err.to_string(), "context deadline exceeded");
        assert!(err.into_operation_error().is_none());
    }

    #[test]
    fn test_retry_error_source_chain() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let err = RetryError::Operation(io);
        // Display forwards to the inner error, so `source` skips it.
        assert_eq!(err.to_string(), "read timed out");
        assert!(err.source().is_none());
    }
}
