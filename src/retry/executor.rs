//! The retry loop.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::error::RetryError;
use super::policy::RetryPolicy;
use crate::cancel::{CancelReason, CancelSignal};

/// Information about a failed attempt, passed to hooks before the wait.
#[derive(Debug, Clone)]
pub struct RetryEvent<'a, E> {
    /// Which attempt just failed (1-indexed).
    pub attempt: u32,
    /// The error from the failed attempt.
    pub error: &'a E,
    /// Delay before the next attempt.
    pub next_delay: Duration,
    /// Total elapsed time since the first attempt started.
    pub elapsed: Duration,
}

impl<E> RetryPolicy<E> {
    /// Run `operation` until it succeeds or the policy gives up.
    ///
    /// The operation receives a clone of `ctx` on every attempt and should
    /// watch it for cancellation while it runs. Between attempts the
    /// executor sleeps for the backoff delay, but wakes as soon as `ctx`
    /// fires.
    ///
    /// | Outcome | Result |
    /// |---|---|
    /// | operation succeeds | `Ok(value)` |
    /// | predicate rejects the error | `Err(Operation(e))`, no wait |
    /// | `max_attempts` invocations failed | `Err(Operation(last_e))` |
    /// | `ctx` fires before an attempt, during a retryable attempt, or during a wait | `Err(Cancelled(reason))` |
    ///
    /// # Examples
    ///
    /// ```rust
    /// use retrier::{Context, RetryPolicy};
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let policy = RetryPolicy::builder(5)
    ///     .base_delay(Duration::from_millis(1))
    ///     .build()
    ///     .unwrap();
    /// let calls = AtomicU32::new(0);
    /// let counter = &calls;
    ///
    /// let result = policy
    ///     .retry(&Context::background(), move |_| async move {
    ///         match counter.fetch_add(1, Ordering::SeqCst) {
    ///             0 | 1 => Err("transient"),
    ///             _ => Ok("done"),
    ///         }
    ///     })
    ///     .await;
    ///
    /// assert_eq!(result, Ok("done"));
    /// assert_eq!(calls.load(Ordering::SeqCst), 3);
    /// # });
    /// ```
    pub async fn retry<C, F, Fut, T>(&self, ctx: &C, operation: F) -> Result<T, RetryError<E>>
    where
        C: CancelSignal,
        F: FnMut(C) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.retry_with_hooks(ctx, operation, |_: &RetryEvent<'_, E>| {})
            .await
    }

    /// Like [`retry`](RetryPolicy::retry), calling `on_retry` before every wait.
    ///
    /// The hook runs synchronously inside the retry loop and should not
    /// block; use it for logging or metrics. It is not called for a success,
    /// a non-retryable error, the final exhausted attempt, or an attempt
    /// during which `ctx` fired.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use retrier::{Context, RetryError, RetryEvent, RetryPolicy};
    /// use std::sync::Mutex;
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let policy = RetryPolicy::builder(3)
    ///     .base_delay(Duration::from_millis(1))
    ///     .jitter(0.0)
    ///     .build()
    ///     .unwrap();
    /// let seen = Mutex::new(Vec::new());
    ///
    /// let result = policy
    ///     .retry_with_hooks(
    ///         &Context::background(),
    ///         |_| async { Err::<(), _>("down") },
    ///         |event: &RetryEvent<'_, &str>| {
    ///             seen.lock().unwrap().push((event.attempt, event.next_delay));
    ///         },
    ///     )
    ///     .await;
    ///
    /// assert_eq!(result, Err(RetryError::Operation("down")));
    /// assert_eq!(
    ///     *seen.lock().unwrap(),
    ///     vec![(1, Duration::from_millis(1)), (2, Duration::from_millis(2))]
    /// );
    /// # });
    /// ```
    pub async fn retry_with_hooks<C, F, Fut, T, H>(
        &self,
        ctx: &C,
        mut operation: F,
        on_retry: H,
    ) -> Result<T, RetryError<E>>
    where
        C: CancelSignal,
        F: FnMut(C) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: Fn(&RetryEvent<'_, E>),
    {
        let start = Instant::now();
        let mut attempt = 1u32;

        loop {
            if let Some(reason) = ctx.reason() {
                tracing::debug!(attempt, reason = %reason, "retry canceled before attempt");
                return Err(RetryError::Cancelled(reason));
            }

            let error = match operation(ctx.clone()).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::trace!(attempts = attempt, "retry succeeded");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.should_retry(&error) {
                tracing::trace!(attempt, "non-retryable error");
                return Err(RetryError::Operation(error));
            }

            if self.exhausted(attempt) {
                tracing::trace!(attempts = attempt, "retry attempts exhausted");
                return Err(RetryError::Operation(error));
            }

            if let Some(reason) = ctx.reason() {
                tracing::debug!(attempt, reason = %reason, "retry canceled during attempt");
                return Err(RetryError::Cancelled(reason));
            }

            let delay = self.backoff().delay(attempt);
            on_retry(&RetryEvent {
                attempt,
                error: &error,
                next_delay: delay,
                elapsed: start.elapsed(),
            });
            tracing::debug!(attempt, ?delay, "retrying after retryable error");
            drop(error);

            tokio::select! {
                biased;
                () = ctx.cancelled() => {
                    let reason = ctx.reason().unwrap_or(CancelReason::Cancelled);
                    tracing::debug!(attempt, reason = %reason, "retry canceled during backoff");
                    return Err(RetryError::Cancelled(reason));
                }
                () = tokio::time::sleep(delay) => {}
            }

            attempt = attempt.saturating_add(1);
        }
    }
}
