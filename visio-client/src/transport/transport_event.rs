use crate::media::MediaTrack;
use crate::transport::IceConnectionState;
use visio_core::IceCandidate;

/// Notifications a media transport pushes to its owner.
#[derive(Debug)]
pub enum TransportEvent {
    /// Local tracks changed and a new offer/answer round is required.
    NegotiationNeeded,

    /// Trickle ICE: a local candidate to forward to the remote peer.
    CandidateGenerated(IceCandidate),

    /// The remote peer started sending a track.
    TrackReceived(MediaTrack),

    ConnectionStateChanged(IceConnectionState),
}
