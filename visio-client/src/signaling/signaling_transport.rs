use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// An open text link to the signaling server.
///
/// The link is closed once `receiver` yields `None`; dropping `sender` asks
/// the transport to close it.
#[derive(Debug)]
pub struct TransportLink {
    pub sender: mpsc::UnboundedSender<String>,
    pub receiver: mpsc::UnboundedReceiver<String>,
}

/// Opens byte-stream connections for the signaling channel.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn open(&self, address: &str) -> Result<TransportLink>;
}
