//! Cancellation signal shared between the frame producer and the updater.
//!
//! A `CancelToken` is monotonic: once it fires it stays fired, and the first
//! reason recorded is the one every observer sees.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Why a token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Someone called `cancel()` (e.g. an interrupt signal)
    Cancelled,
    /// A deadline set with `cancel_after` elapsed
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "operation cancelled"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Cloneable cancellation handle.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<Option<CancelReason>>>,
    rx: watch::Receiver<Option<CancelReason>>,
}

impl CancelToken {
    /// Create a token that has not fired
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self { tx: Arc::new(tx), rx }
    }

    /// Create a token that fires with `DeadlineExceeded` after `timeout`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_deadline(timeout: Duration) -> Self {
        let token = Self::new();
        token.cancel_after(timeout);
        token
    }

    /// Fire the token with `CancelReason::Cancelled`
    pub fn cancel(&self) {
        self.fire(CancelReason::Cancelled);
    }

    /// Arm a timer that fires the token with `DeadlineExceeded`.
    pub fn cancel_after(&self, timeout: Duration) {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => token.fire(CancelReason::DeadlineExceeded),
                _ = token.cancelled() => {}
            }
        });
    }

    fn fire(&self, reason: CancelReason) {
        let fired = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if fired {
            log::debug!("Cancel token fired: {}", reason);
        }
    }

    /// The reason this token fired, if it has
    pub fn reason(&self) -> Option<CancelReason> {
        *self.rx.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Wait until the token fires.
    ///
    /// Resolves immediately if it already has. Safe to use as a
    /// `tokio::select!` branch; dropping the future loses nothing.
    pub async fn cancelled(&self) -> CancelReason {
        let mut rx = self.rx.clone();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            // The sender lives as long as any clone of this token, so this
            // only errors once no one can fire it anymore.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);
    }

    #[test]
    fn test_cancel_is_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert_eq!(token.reason(), Some(CancelReason::Cancelled));
    }

    #[test]
    fn test_first_reason_wins() {
        let token = CancelToken::new();
        token.cancel();
        token.fire(CancelReason::DeadlineExceeded);
        assert_eq!(token.reason(), Some(CancelReason::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_fired() {
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(token.cancelled().await, CancelReason::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::task::yield_now().await;
        token.cancel();
        assert_eq!(waiter.await.unwrap(), CancelReason::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let token = CancelToken::with_deadline(Duration::from_secs(5));
        assert!(!token.is_cancelled());
        let reason = token.cancelled().await;
        assert_eq!(reason, CancelReason::DeadlineExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_cancel_beats_deadline() {
        let token = CancelToken::with_deadline(Duration::from_secs(5));
        token.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(token.reason(), Some(CancelReason::Cancelled));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(CancelReason::Cancelled.to_string(), "operation cancelled");
        assert_eq!(CancelReason::DeadlineExceeded.to_string(), "deadline exceeded");
    }
}
