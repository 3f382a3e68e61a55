//! Retry with exponential backoff and cooperative cancellation.
//!
//! - [`RetryPolicy`] is immutable data: an attempt limit, a [`Backoff`]
//!   schedule, and a [`RetryPredicate`]. Build it once, share it freely.
//! - [`RetryPolicy::retry`] drives the attempt loop for one call. Calls are
//!   independent; nothing but the read-only policy is shared between them.
//! - [`retry()`] and [`infinite`] are shortcuts over default policies.
//!
//! # Quick Start
//!
//! ```rust
//! use retrier::{Context, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::builder(3)
//!     .base_delay(Duration::from_millis(1))
//!     .retryable(|e: &std::io::Error| e.kind() == std::io::ErrorKind::TimedOut)
//!     .build()
//!     .unwrap();
//!
//! let value = policy
//!     .retry(&Context::background(), |_| async { Ok::<_, std::io::Error>(42) })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(value, 42);
//! # });
//! ```
//!
//! # Jitter
//!
//! Each delay is spread uniformly over `±jitter` of its nominal value, then
//! clamped to `[0, max_delay]`. Jitter keeps many callers that failed together
//! from retrying in lockstep.
//!
//! # Error Types
//!
//! - [`RetryError`]: the operation's own error, or the cancellation reason
//! - [`PolicyError`]: returned when building an invalid policy

mod backoff;
mod config;
mod error;
mod executor;
mod policy;
mod predicate;

pub use backoff::Backoff;
pub use config::RetryConfig;
pub use error::{PolicyError, RetryError};
pub use executor::RetryEvent;
pub use policy::{
    RetryOption, RetryPolicy, RetryPolicyBuilder, DEFAULT_BASE_DELAY, DEFAULT_JITTER,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, DEFAULT_MULTIPLIER,
};
pub use predicate::{AlwaysRetry, ClosurePredicate, NeverRetry, RetryPredicate};

use std::future::Future;

use crate::cancel::CancelSignal;

/// Retry `operation` under the default policy.
///
/// The default policy makes at most [`DEFAULT_MAX_ATTEMPTS`] attempts and
/// treats every error as retryable.
///
/// # Examples
///
/// ```rust
/// use retrier::{Context, RetryError};
///
/// # tokio_test::block_on(async {
/// let ctx = Context::background();
/// ctx.cancel();
///
/// let result = retrier::retry(&ctx, |_| async { Ok::<_, String>(()) }).await;
/// assert!(matches!(result, Err(RetryError::Cancelled(_))));
/// # });
/// ```
pub async fn retry<C, F, Fut, T, E>(ctx: &C, operation: F) -> Result<T, RetryError<E>>
where
    C: CancelSignal,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: 'static,
{
    RetryPolicy::default().retry(ctx, operation).await
}

/// Retry `operation` until it succeeds or `ctx` fires.
///
/// Uses the default backoff with no attempt limit. Every error is retried,
/// so the only ways out are success and cancellation.
pub async fn infinite<C, F, Fut, T, E>(ctx: &C, operation: F) -> Result<T, RetryError<E>>
where
    C: CancelSignal,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: 'static,
{
    RetryPolicy::unbounded().retry(ctx, operation).await
}
