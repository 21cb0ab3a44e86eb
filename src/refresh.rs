//! Background refresh ticker
//!
//! Signals the front end on a fixed interval so it can call
//! `App::refresh_all_weather`. The controller is not shared with the
//! ticker task; the ticker only sends messages over a tokio channel.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Messages sent from the ticker to the main loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshMessage {
    /// The refresh interval elapsed
    RefreshDue,
    /// A refresh was requested explicitly
    RefreshRequested,
}

/// Configuration for the refresh interval
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between refreshes
    pub interval: Duration,
    /// Whether auto-refresh is enabled
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(600), // 10 minutes
            enabled: true,
        }
    }
}

/// Handle for controlling the background ticker
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    /// Sender used for explicit refresh requests
    request_tx: mpsc::Sender<RefreshMessage>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Creates a new RefreshHandle and spawns the ticker task
    ///
    /// # Arguments
    /// * `config` - Configuration for the refresh interval
    ///
    /// # Returns
    /// A RefreshHandle that receives ticks via the `receiver` channel
    pub fn spawn(config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            let interval_len = config.interval;
            let tx = msg_tx.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(interval_len);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            debug!("Refresh interval elapsed");
                            if tx.send(RefreshMessage::RefreshDue).await.is_err() {
                                break;
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            request_tx: msg_tx,
            shutdown_tx,
        }
    }

    /// Requests an immediate refresh
    pub async fn request_refresh(&self) {
        let _ = self.request_tx.send(RefreshMessage::RefreshRequested).await;
    }

    /// Shuts down the ticker task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Checks for pending refresh messages without blocking
///
/// # Returns
/// * `Some(RefreshMessage)` if a message was available
/// * `None` if no messages are pending
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    handle.receiver.try_recv().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_config_default() {
        let config = RefreshConfig::default();
        assert_eq!(config.interval, Duration::from_secs(600));
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn test_refresh_handle_spawn_disabled() {
        let config = RefreshConfig {
            enabled: false,
            ..Default::default()
        };

        let mut handle = RefreshHandle::spawn(config);

        // With refresh disabled, there should be no messages
        assert!(try_recv(&mut handle).is_none());
    }

    #[tokio::test]
    async fn test_ticker_sends_refresh_due() {
        let config = RefreshConfig {
            interval: Duration::from_millis(20),
            enabled: true,
        };

        let mut handle = RefreshHandle::spawn(config);
        let msg = tokio::time::timeout(Duration::from_secs(2), handle.receiver.recv())
            .await
            .expect("Ticker should fire");

        assert_eq!(msg, Some(RefreshMessage::RefreshDue));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_request_refresh_is_delivered_immediately() {
        let config = RefreshConfig {
            enabled: false,
            ..Default::default()
        };

        let mut handle = RefreshHandle::spawn(config);
        handle.request_refresh().await;

        assert_eq!(try_recv(&mut handle), Some(RefreshMessage::RefreshRequested));
    }
}
