//! Cooperative cancellation signals.
//!
//! A cancellation signal has two halves: a "done" notification that can be
//! awaited concurrently with a timer, and a reason that can be read once the
//! signal is done. The retry executor races the notification against its
//! backoff sleep and surfaces the reason verbatim when it gives up.
//!
//! [`Context`] is the concrete signal shipped with this crate. It supports
//! explicit cancellation, deadlines, and parent/child derivation. A bare
//! [`CancellationToken`] also works as a signal, with reason
//! [`CancelReason::Cancelled`].
//!
//! # Examples
//!
//! ```rust
//! use retrier::{CancelReason, CancelSignal, Context};
//!
//! let parent = Context::background();
//! let child = parent.child();
//!
//! assert!(!child.is_done());
//! parent.cancel();
//! assert_eq!(child.reason(), Some(CancelReason::Cancelled));
//! ```

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a cancellation signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CancelReason {
    /// The signal was cancelled explicitly.
    #[error("context canceled")]
    Cancelled,
    /// The signal's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// A cooperative cancellation signal.
///
/// Implementations must be cheap to clone; clones observe the same signal.
pub trait CancelSignal: Clone + Send + Sync {
    /// Resolves once the signal is done. Resolves immediately if it already is.
    fn cancelled(&self) -> impl Future<Output = ()> + Send;

    /// The reason the signal fired, or `None` while it has not.
    fn reason(&self) -> Option<CancelReason>;

    /// Returns true once the signal has fired.
    fn is_done(&self) -> bool {
        self.reason().is_some()
    }
}

impl CancelSignal for CancellationToken {
    fn cancelled(&self) -> impl Future<Output = ()> + Send {
        CancellationToken::cancelled(self)
    }

    fn reason(&self) -> Option<CancelReason> {
        self.is_cancelled().then_some(CancelReason::Cancelled)
    }
}

/// A cancellation context with an optional deadline.
///
/// Cloning a `Context` yields a handle to the same signal. Use
/// [`Context::child`] to derive a signal that is cancelled with its parent
/// but can also be cancelled on its own.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    fired: OnceLock<Fired>,
    parent: Option<Context>,
}

/// A reason together with the instant it took effect.
#[derive(Debug, Clone, Copy)]
struct Fired {
    reason: CancelReason,
    at: Instant,
}

impl Context {
    /// A root context that is only done once [`Context::cancel`] is called.
    pub fn background() -> Self {
        Self::root(None)
    }

    /// A root context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::root(Some(Instant::now() + timeout))
    }

    /// A root context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::root(Some(deadline))
    }

    fn root(deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                deadline,
                fired: OnceLock::new(),
                parent: None,
            }),
        }
    }

    /// Derive a child that shares this context's deadline.
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// Derive a child that expires `timeout` from now, or with its parent,
    /// whichever comes first.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.derive(Some(Instant::now() + timeout))
    }

    /// Derive a child that expires at `deadline`, or with its parent,
    /// whichever comes first.
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        self.derive(Some(deadline))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let deadline = match (self.inner.deadline, deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            inner: Arc::new(Inner {
                token: self.inner.token.child_token(),
                deadline,
                fired: OnceLock::new(),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Cancel this context and every context derived from it.
    ///
    /// The first reason to take effect wins: cancelling a context whose
    /// deadline has already passed, or whose parent is already done, keeps
    /// the earlier reason.
    pub fn cancel(&self) {
        if self.fired().is_none() {
            let _ = self.inner.fired.set(Fired {
                reason: CancelReason::Cancelled,
                at: Instant::now(),
            });
        }
        self.inner.token.cancel();
    }

    /// The instant this context expires, if it has a deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Resolve why and when this context became done, fixing the answer
    /// the first time it is seen so later reads never disagree.
    fn fired(&self) -> Option<Fired> {
        if let Some(fired) = self.inner.fired.get() {
            return Some(*fired);
        }

        let now = Instant::now();
        let expired = self
            .inner
            .deadline
            .filter(|deadline| now >= *deadline)
            .map(|at| Fired {
                reason: CancelReason::DeadlineExceeded,
                at,
            });
        let inherited = self.inner.parent.as_ref().and_then(Context::fired);

        let fired = match (expired, inherited) {
            (Some(own), Some(parent)) if parent.at < own.at => parent,
            (Some(own), _) => own,
            (None, Some(parent)) => parent,
            (None, None) if self.inner.token.is_cancelled() => Fired {
                reason: CancelReason::Cancelled,
                at: now,
            },
            (None, None) => return None,
        };

        Some(*self.inner.fired.get_or_init(|| fired))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl CancelSignal for Context {
    fn cancelled(&self) -> impl Future<Output = ()> + Send {
        async move {
            match self.inner.deadline {
                Some(deadline) => {
                    tokio::select! {
                        () = self.inner.token.cancelled() => {}
                        () = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => self.inner.token.cancelled().await,
            }
        }
    }

    fn reason(&self) -> Option<CancelReason> {
        self.fired().map(|fired| fired.reason)
    }
}
