use crate::session::RemoteStream;
use tokio::sync::oneshot;
use visio_core::PeerId;

/// Requests from [`Session`](crate::Session) handles to the session loop.
pub enum SessionCommand {
    Peers {
        reply: oneshot::Sender<Vec<PeerId>>,
    },

    RemoteStream {
        peer_id: PeerId,
        reply: oneshot::Sender<Option<RemoteStream>>,
    },

    /// Tear everything down and stop the loop.
    Close { done: oneshot::Sender<()> },
}
