//! # Retrier
//!
//! Re-run fallible async operations under an exponential-backoff schedule,
//! until they succeed, fail permanently, run out of attempts, or are
//! cancelled.
//!
//! ## Quick Example
//!
//! ```rust
//! use retrier::{Context, RetryError, RetryPolicy};
//! use std::time::Duration;
//!
//! #[derive(Debug, PartialEq)]
//! enum FetchError {
//!     Unavailable,
//!     NotFound,
//! }
//!
//! # tokio_test::block_on(async {
//! // Build once, share across every call.
//! let policy = RetryPolicy::builder(4)
//!     .base_delay(Duration::from_millis(5))
//!     .max_delay(Duration::from_millis(50))
//!     .jitter(0.2)
//!     .retryable(|e: &FetchError| *e == FetchError::Unavailable)
//!     .build()
//!     .unwrap();
//!
//! let ctx = Context::with_timeout(Duration::from_secs(5));
//!
//! // Permanent errors come back on the first attempt.
//! let result = policy
//!     .retry(&ctx, |_| async { Err::<(), _>(FetchError::NotFound) })
//!     .await;
//! assert_eq!(result, Err(RetryError::Operation(FetchError::NotFound)));
//! # });
//! ```
//!
//! ## Cancellation
//!
//! Every call takes a [`CancelSignal`]. The loop checks it before each
//! attempt and races it against every backoff sleep, so a cancelled call
//! returns without waiting out its delay. The operation receives the signal
//! too and is expected to honour it while it runs.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cancel;
pub mod retry;

// Re-exports
pub use cancel::{CancelReason, CancelSignal, Context};
pub use retry::{
    infinite, retry, AlwaysRetry, Backoff, ClosurePredicate, NeverRetry, PolicyError,
    RetryConfig, RetryError, RetryEvent, RetryOption, RetryPolicy, RetryPolicyBuilder,
    RetryPredicate,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::{CancelReason, CancelSignal, Context};
    pub use crate::retry::{
        infinite, retry, PolicyError, RetryError, RetryEvent, RetryPolicy, RetryPredicate,
    };
}
