use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

use super::mock_signaling_transport::ServerLink;
use visio_core::{Message, MessageKind};

/// Timeout for signal exchange operations (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 5000;

/// Poll interval of [`wait_until`] (ms).
pub const POLL_INTERVAL_MS: u64 = 10;

/// Receive the next item or give up after [`SIGNAL_TIMEOUT_MS`].
pub async fn recv_timeout<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Option<T> {
    tokio::time::timeout(Duration::from_millis(SIGNAL_TIMEOUT_MS), rx.recv())
        .await
        .ok()
        .flatten()
}

/// Wait until `condition` holds, polling every [`POLL_INTERVAL_MS`].
pub async fn wait_until<F, Fut>(mut condition: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let wait = async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    };
    tokio::time::timeout(Duration::from_millis(timeout_ms), wait)
        .await
        .is_ok()
}

/// Read frames from the client until one of `kind` arrives.
pub async fn wait_for_kind(link: &mut ServerLink, kind: MessageKind) -> Option<Message> {
    let wait = async {
        while let Some(message) = link.recv().await {
            if message.kind == kind {
                return Some(message);
            }
        }
        None
    };
    tokio::time::timeout(Duration::from_millis(SIGNAL_TIMEOUT_MS), wait)
        .await
        .ok()
        .flatten()
}

/// Collect whatever is already queued on `rx`.
pub fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}
