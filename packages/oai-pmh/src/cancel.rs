//! Cancellation signals for in-flight requests.
//!
//! An [`AbortSignal`] fires when any of its cancellation tokens is cancelled
//! or when its deadline passes. Signals combine with [`AbortSignal::any`], so
//! a caller-supplied signal and the per-attempt timeout can be raced against
//! the same request.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// One of the cancellation tokens was cancelled.
    Cancelled,
    /// The deadline passed.
    TimedOut,
}

/// A composable cancellation signal.
///
/// The default signal never fires.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    tokens: Vec<CancellationToken>,
    deadline: Option<Instant>,
}

impl AbortSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    /// A signal that fires when `token` is cancelled.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            tokens: vec![token],
            deadline: None,
        }
    }

    /// A signal that fires once `timeout` has elapsed from now.
    ///
    /// A timeout too large to represent as an instant never fires.
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            tokens: Vec::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// A signal that fires as soon as either `a` or `b` fires.
    #[must_use]
    pub fn any(a: &AbortSignal, b: &AbortSignal) -> Self {
        let tokens = a.tokens.iter().chain(&b.tokens).cloned().collect();
        let deadline = match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => Some(x.min(y)),
            (x, y) => x.or(y),
        };
        Self { tokens, deadline }
    }

    /// The reason this signal has already fired, if it has.
    ///
    /// Cancellation takes precedence over an elapsed deadline.
    #[must_use]
    pub fn reason(&self) -> Option<AbortReason> {
        if self.tokens.iter().any(CancellationToken::is_cancelled) {
            Some(AbortReason::Cancelled)
        } else if self.deadline.is_some_and(|d| d <= Instant::now()) {
            Some(AbortReason::TimedOut)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.reason().is_some()
    }

    /// Wait until the signal fires. Never completes for [`AbortSignal::never`].
    pub async fn aborted(&self) -> AbortReason {
        let cancelled = async {
            if self.tokens.is_empty() {
                std::future::pending::<()>().await;
            } else {
                let waits = self
                    .tokens
                    .iter()
                    .map(|token| Box::pin(token.cancelled()));
                futures::future::select_all(waits).await;
            }
        };

        let timed_out = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            () = cancelled => AbortReason::Cancelled,
            () = timed_out => AbortReason::TimedOut,
        }
    }
}

impl From<CancellationToken> for AbortSignal {
    fn from(token: CancellationToken) -> Self {
        Self::from_token(token)
    }
}
