use crate::media::MediaStream;
use visio_core::PeerId;

/// Participant lifecycle notifications emitted by a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PeerJoined(PeerId),

    PeerLeft(PeerId),

    /// The remote peer's media started flowing. Emitted once per peer; later
    /// tracks are added to the same stream.
    RemoteStream { peer_id: PeerId, stream: MediaStream },
}
