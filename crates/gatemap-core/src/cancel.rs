//! Request cancellation over a `tokio::sync::watch` channel
//!
//! A [`CancellationSource`] is held by whoever owns the request (the front
//! door, a timeout guard, a test); each [`MappingContext`](crate::MappingContext)
//! carries a cheap, cloneable [`CancellationSignal`] that behaviors check
//! before and race against every suspension point.

use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::watch;

/// Owner side: flips the flag once
#[derive(Debug, Clone)]
pub struct CancellationSource {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationSource {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// A signal observing this source
    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            receiver: Some(self.sender.subscribe()),
        }
    }

    /// Cancel every signal derived from this source; idempotent
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side; the default signal is never cancelled
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl CancellationSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .map_or(false, |receiver| *receiver.borrow())
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::cancelled(operation))
        } else {
            Ok(())
        }
    }

    /// Resolves once cancellation is requested.
    ///
    /// Pends forever for [`CancellationSignal::never`] and when the source is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let Some(receiver) = &self.receiver else {
            return std::future::pending().await;
        };
        let mut receiver = receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let source = CancellationSource::new();
        let signal = source.signal();
        assert!(!signal.is_cancelled());
        assert!(signal.check("test").is_ok());

        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.cancelled().await }
        });
        source.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(signal.is_cancelled());
        assert!(signal.check("test").unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_created_after_cancel_is_cancelled() {
        let source = CancellationSource::new();
        source.cancel();
        let signal = source.signal();
        assert!(signal.is_cancelled());
        signal.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_does_not_fire() {
        let signal = CancellationSignal::never();
        assert!(!signal.is_cancelled());
        let raced = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(raced.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_source_never_fires() {
        let signal = CancellationSource::new().signal();
        let raced = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(raced.is_err());
        assert!(!signal.is_cancelled());
    }
}
