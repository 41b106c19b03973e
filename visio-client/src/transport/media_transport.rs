use crate::media::MediaTrack;
use crate::transport::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use visio_core::{IceCandidate, PeerId, SessionDescription, SignalingState};

/// ICE connectivity as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// One media session with one remote peer.
///
/// Implementations must treat a remote offer applied while in
/// `HaveLocalOffer` as an implicit rollback of the pending local offer.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn add_track(&self, track: MediaTrack) -> Result<()>;

    fn signaling_state(&self) -> SignalingState;

    /// Restarts ICE in place. `Ok(false)` means the engine cannot, and the
    /// caller should renegotiate instead.
    async fn restart_ice(&self) -> Result<bool> {
        Ok(false)
    }

    async fn close(&self) -> Result<()>;
}

/// Creates one [`MediaTransport`] per remote peer.
#[async_trait]
pub trait MediaTransportFactory: Send + Sync {
    /// `event_tx` receives every notification of the new transport.
    async fn create(
        &self,
        peer_id: &PeerId,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn MediaTransport>>;
}
