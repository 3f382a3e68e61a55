//! Retry Patterns Example
//!
//! Demonstrates the retry executor in practical settings:
//! - Bounded retry with exponential backoff
//! - Conditional retry (permanent errors fail fast)
//! - Observing retries through a hook
//! - Deadlines and explicit cancellation
//! - Retrying indefinitely until success
//!
//! Run with `RUST_LOG` unset; the executor's own debug logs are printed.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use retrier::prelude::*;

#[derive(Debug, Clone, PartialEq)]
enum HttpError {
    ServerError(u16),
    ClientError(u16),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ServerError(code) => write!(f, "server error {}", code),
            HttpError::ClientError(code) => write!(f, "client error {}", code),
        }
    }
}

fn is_retryable(err: &HttpError) -> bool {
    matches!(err, HttpError::ServerError(_))
}

fn http_policy(max_attempts: u32) -> RetryPolicy<HttpError> {
    RetryPolicy::builder(max_attempts)
        .base_delay(Duration::from_millis(50))
        .max_delay(Duration::from_millis(400))
        .jitter(0.2)
        .retryable(is_retryable)
        .build()
        .expect("valid policy")
}

// ==================== Bounded Retry ====================

/// Example 1: a flaky endpoint that recovers on the third call.
async fn example_bounded_retry() {
    println!("\n=== Example 1: Bounded Retry ===");

    let attempts = Arc::new(AtomicU32::new(0));
    let result = http_policy(5)
        .retry(&Context::background(), |_| {
            let attempts = attempts.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                println!("  Attempt {}", n + 1);
                if n < 2 {
                    Err(HttpError::ServerError(503))
                } else {
                    Ok("200 OK")
                }
            }
        })
        .await;

    println!("Result: {:?}", result);
}

// ==================== Conditional Retry ====================

/// Example 2: a 400 is permanent, so there is exactly one attempt.
async fn example_conditional_retry() {
    println!("\n=== Example 2: Conditional Retry ===");

    let attempts = Arc::new(AtomicU32::new(0));
    let result = http_policy(5)
        .retry(&Context::background(), |_| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(HttpError::ClientError(400))
            }
        })
        .await;

    match result {
        Ok(()) => println!("Unexpected success"),
        Err(e) => println!("Request failed without retry: {}", e),
    }
    println!("Total attempts: {}", attempts.load(Ordering::SeqCst));
}

// ==================== Hooks ====================

/// Example 3: report each retry before the executor sleeps.
async fn example_hooks() {
    println!("\n=== Example 3: Retry Hooks ===");

    let result = http_policy(4)
        .retry_with_hooks(
            &Context::background(),
            |_| async { Err::<(), _>(HttpError::ServerError(502)) },
            |event: &RetryEvent<'_, HttpError>| {
                println!(
                    "  Attempt {} failed ({}), next delay {:?}, elapsed {:?}",
                    event.attempt, event.error, event.next_delay, event.elapsed
                );
            },
        )
        .await;

    println!("Gave up with: {:?}", result);
}

// ==================== Cancellation ====================

/// Example 4: a deadline cuts a long backoff short.
async fn example_deadline() {
    println!("\n=== Example 4: Deadline ===");

    let policy = RetryPolicy::builder(0)
        .base_delay(Duration::from_secs(2))
        .max_delay(Duration::from_secs(30))
        .build()
        .expect("valid policy");
    let ctx = Context::with_timeout(Duration::from_millis(300));

    let start = tokio::time::Instant::now();
    let result = policy
        .retry(&ctx, |_| async { Err::<(), _>(HttpError::ServerError(504)) })
        .await;

    println!("Result after {:?}: {:?}", start.elapsed(), result);
}

/// Example 5: another task cancels the call while it is waiting.
async fn example_explicit_cancel() {
    println!("\n=== Example 5: Explicit Cancel ===");

    let ctx = Context::background();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        println!("  Cancelling");
        canceller.cancel();
    });

    let result = infinite(&ctx, |_| async { Err::<(), _>(HttpError::ServerError(500)) }).await;

    println!("Result: {:?}", result);
}

// ==================== Infinite ====================

/// Example 6: retry forever, scoped by a parent deadline.
async fn example_infinite() {
    println!("\n=== Example 6: Infinite Retry ===");

    let parent = Context::with_timeout(Duration::from_secs(10));
    let attempts = Arc::new(AtomicU32::new(0));

    let result = infinite(&parent.child(), |ctx: Context| {
        let attempts = attempts.clone();
        async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            println!("  Attempt {} (deadline {:?})", n + 1, ctx.deadline());
            if n < 3 {
                Err("not ready")
            } else {
                Ok(n + 1)
            }
        }
    })
    .await;

    println!("Result: {:?}", result);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("======================================");
    println!("       Retry Patterns Example         ");
    println!("======================================");

    example_bounded_retry().await;
    example_conditional_retry().await;
    example_hooks().await;
    example_deadline().await;
    example_explicit_cancel().await;
    example_infinite().await;

    println!("\n======================================");
    println!("           Examples Complete           ");
    println!("======================================");
}
