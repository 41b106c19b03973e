use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    Unknown,
}

impl From<RTPCodecType> for TrackKind {
    fn from(kind: RTPCodecType) -> Self {
        match kind {
            RTPCodecType::Audio => TrackKind::Audio,
            RTPCodecType::Video => TrackKind::Video,
            _ => TrackKind::Unknown,
        }
    }
}

/// Underlying engine object of a track.
#[derive(Clone)]
pub enum TrackSource {
    /// Track we send (captured or synthesized locally).
    Local(Arc<dyn TrackLocal + Send + Sync>),
    /// Track surfaced by the engine for an inbound RTP stream.
    Remote(Arc<TrackRemote>),
}

#[derive(Clone)]
pub struct MediaTrack {
    id: String,
    stream_id: String,
    kind: TrackKind,
    source: TrackSource,
}

impl MediaTrack {
    pub fn local(track: Arc<dyn TrackLocal + Send + Sync>) -> Self {
        Self {
            id: track.id().to_owned(),
            stream_id: track.stream_id().to_owned(),
            kind: TrackKind::from(track.kind()),
            source: TrackSource::Local(track),
        }
    }

    pub fn remote(track: Arc<TrackRemote>) -> Self {
        Self {
            id: track.id(),
            stream_id: track.stream_id(),
            kind: TrackKind::from(track.kind()),
            source: TrackSource::Remote(track),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn source(&self) -> &TrackSource {
        &self.source
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            TrackSource::Local(_) => "local",
            TrackSource::Remote(_) => "remote",
        };
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .field("source", &source)
            .finish()
    }
}

/// A group of tracks sharing a stream id.
///
/// Clones share the same track list, so tracks added after a stream was handed
/// out are visible to every holder.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Arc<RwLock<Vec<MediaTrack>>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_tracks(id, Vec::new())
    }

    pub fn with_tracks(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks: Arc::new(RwLock::new(tracks)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn tracks(&self) -> Vec<MediaTrack> {
        self.tracks.read().await.clone()
    }

    /// Adds `track` unless a track with the same id is already present.
    pub async fn add_track(&self, track: MediaTrack) {
        let mut tracks = self.tracks.write().await;
        if tracks.iter().all(|existing| existing.id() != track.id()) {
            tracks.push(track);
        }
    }

    /// Whether both handles point at the same underlying stream.
    pub fn same_stream(&self, other: &MediaStream) -> bool {
        Arc::ptr_eq(&self.tracks, &other.tracks)
    }
}
