//! Shutdown signal shared between the OS signal handlers and the loop

use tokio::sync::watch;
use tracing::warn;

/// Cancellation flag the monitor checks between ticks and races against
/// every suspension point (sleep, settle delay, confirmation prompt).
///
/// Clones observe the same flag.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Check if shutdown was requested
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Request shutdown
    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    /// Resolves once shutdown has been requested
    pub async fn requested(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so this cannot fail while we are borrowed
        let _ = rx.wait_for(|stop| *stop).await;
    }

    /// Route SIGINT and SIGTERM (Ctrl+C on Windows) into this signal.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install_os_handlers(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            wait_for_os_signal().await;
            signal.request();
        });
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to register SIGINT handler: {}", e);
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to register SIGINT handler: {}", e);
                term.recv().await;
            }
        }
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to register Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_state() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_requested());

        let clone = signal.clone();
        clone.request();
        assert!(signal.is_requested());

        // Idempotent
        signal.request();
        assert!(clone.is_requested());
    }

    #[tokio::test]
    async fn test_requested_resolves() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();

        let handle = tokio::spawn(async move { waiter.requested().await });
        tokio::task::yield_now().await;
        signal.request();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_requested_when_already_set() {
        let signal = ShutdownSignal::new();
        signal.request();
        signal.requested().await;
    }
}
