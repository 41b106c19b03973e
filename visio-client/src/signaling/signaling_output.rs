use async_trait::async_trait;
use visio_core::Message;

/// Outbound half of the signaling channel as seen by negotiation code.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Sends `message` now or queues it until the channel is open again.
    async fn send(&self, message: Message);
}
