use std::time::Duration;
use tokio::sync::mpsc;

use visio_client::SignalingChannel;

use crate::integration::init_tracing;
use crate::utils::{MockSignalingTransport, wait_until};

#[tokio::test(start_paused = true)]
async fn test_reconnect_backoff_doubles_and_resets() {
    init_tracing();

    let (transport, mut links) = MockSignalingTransport::new();
    transport.refuse(true);

    let (default_tx, _default_rx) = mpsc::unbounded_channel();
    let channel = SignalingChannel::new(
        transport.clone(),
        default_tx,
        Duration::from_millis(1000),
    );
    channel.connect("ws://signaling.test").await;

    // Five failed attempts need at most 1 + 2 + 4 + 8 seconds of retries
    let attempted = wait_until(|| async { transport.attempts().len() >= 5 }, 60_000).await;
    assert!(attempted, "Channel stopped retrying");

    let attempts = transport.attempts();
    for (n, pair) in attempts.windows(2).take(4).enumerate() {
        let gap = pair[1] - pair[0];
        let bound = Duration::from_millis(1000 << n);
        assert!(gap <= bound, "retry {} waited {:?}, bound {:?}", n + 1, gap, bound);
    }
    assert!(channel.backoff_bound().await >= Duration::from_millis(16_000));

    // One success resets the bound
    transport.refuse(false);
    // The pending retry may wait up to the current bound
    let _server = tokio::time::timeout(Duration::from_secs(120), links.recv())
        .await
        .ok()
        .flatten()
        .expect("Channel never reconnected");
    let connected = wait_until(|| channel.is_connected(), 5000).await;
    assert!(connected);
    assert_eq!(channel.backoff_bound().await, Duration::from_millis(1000));
}
