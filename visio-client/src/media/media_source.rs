use crate::media::{MediaConstraints, MediaStream, MediaTrack};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Provider of the local camera/microphone stream.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// May fail, e.g. when permission is denied or no device exists.
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream>;
}

/// Media source backed by static sample tracks.
///
/// The host pushes encoded Opus/VP8 samples into [`audio`](Self::audio) and
/// [`video`](Self::video); every peer the stream is attached to receives them.
pub struct SampleTrackSource {
    stream_id: String,
    audio: Arc<TrackLocalStaticSample>,
    video: Arc<TrackLocalStaticSample>,
}

impl SampleTrackSource {
    pub fn new(stream_id: impl Into<String>) -> Self {
        let stream_id = stream_id.into();

        let audio = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id.clone(),
        ));

        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            "video".to_owned(),
            stream_id.clone(),
        ));

        Self {
            stream_id,
            audio,
            video,
        }
    }

    pub fn audio(&self) -> Arc<TrackLocalStaticSample> {
        self.audio.clone()
    }

    pub fn video(&self) -> Arc<TrackLocalStaticSample> {
        self.video.clone()
    }
}

#[async_trait]
impl MediaSource for SampleTrackSource {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<MediaStream> {
        if !constraints.audio && constraints.video.is_none() {
            bail!("neither audio nor video requested");
        }

        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(MediaTrack::local(self.audio.clone()));
        }
        if let Some(video) = &constraints.video {
            debug!(
                "Video requested: {:?} {}x{}",
                video.facing_mode, video.width.ideal, video.height.ideal
            );
            tracks.push(MediaTrack::local(self.video.clone()));
        }

        Ok(MediaStream::with_tracks(self.stream_id.clone(), tracks))
    }
}
