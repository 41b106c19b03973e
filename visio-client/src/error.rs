use std::sync::Arc;
use thiserror::Error;

/// A failed engine step while negotiating with one peer.
///
/// These never tear the session down; the caller logs them and keeps the
/// peer record.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("failed to create offer: {0:#}")]
    Offer(anyhow::Error),

    #[error("failed to create answer: {0:#}")]
    Answer(anyhow::Error),

    #[error("failed to apply local description: {0:#}")]
    LocalDescription(anyhow::Error),

    #[error("failed to apply remote description: {0:#}")]
    RemoteDescription(anyhow::Error),

    #[error("failed to add remote candidate: {0:#}")]
    Candidate(anyhow::Error),

    #[error("failed to attach local track: {0:#}")]
    Track(anyhow::Error),

    #[error("failed to restart ICE: {0:#}")]
    Restart(anyhow::Error),
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("local media unavailable: {0:#}")]
    MediaAcquisition(Arc<anyhow::Error>),

    #[error("session closed")]
    Closed,
}
