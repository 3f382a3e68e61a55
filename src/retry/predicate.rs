//! Retryability predicates.
//!
//! The executor never inspects error types itself; it only asks the policy's
//! [`RetryPredicate`] whether a failure deserves another attempt.

use std::fmt;

/// Decides whether a failed attempt should be retried.
///
/// # Examples
///
/// ```rust
/// use retrier::RetryPredicate;
/// use std::io::{Error, ErrorKind};
///
/// struct TransientIo;
///
/// impl RetryPredicate<Error> for TransientIo {
///     fn should_retry(&self, error: &Error) -> bool {
///         matches!(
///             error.kind(),
///             ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::ConnectionReset
///         )
///     }
/// }
///
/// assert!(TransientIo.should_retry(&Error::from(ErrorKind::TimedOut)));
/// assert!(!TransientIo.should_retry(&Error::from(ErrorKind::NotFound)));
/// ```
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    /// Returns true if `error` warrants another attempt.
    fn should_retry(&self, error: &E) -> bool;
}

/// Treats every error as retryable. This is the default predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// Treats every error as permanent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn should_retry(&self, _error: &E) -> bool {
        false
    }
}

/// Adapts a closure into a [`RetryPredicate`].
#[derive(Clone)]
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    /// Wrap `predicate`.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> fmt::Debug for ClosurePredicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosurePredicate").finish_non_exhaustive()
    }
}

impl<E: ?Sized, F> RetryPredicate<E> for ClosurePredicate<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_and_never() {
        assert!(AlwaysRetry.should_retry("anything"));
        assert!(!NeverRetry.should_retry("anything"));
    }

    #[test]
    fn test_closure_predicate() {
        #[derive(Debug, PartialEq)]
        enum ApiError {
            RateLimited,
            NotFound,
        }

        let predicate = ClosurePredicate::new(|e: &ApiError| *e == ApiError::RateLimited);
        assert!(predicate.should_retry(&ApiError::RateLimited));
        assert!(!predicate.should_retry(&ApiError::NotFound));
    }

    #[test]
    fn test_closure_predicate_debug() {
        let predicate = ClosurePredicate::new(|_: &u8| true);
        assert!(format!("{:?}", predicate).contains("ClosurePredicate"));
    }
}
