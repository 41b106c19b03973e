use crate::media::{MediaTrack, TrackSource};
use crate::transport::{
    IceConnectionState, MediaTransport, MediaTransportFactory, TransportConfig, TransportEvent,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use visio_core::{IceCandidate, PeerId, SdpType, SessionDescription, SignalingState};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// [`MediaTransport`] backed by a `webrtc` peer connection.
///
/// The `webrtc` engine cannot roll back a local offer. When a remote offer
/// collides with one, the peer connection is rebuilt with the same local
/// tracks and the remote offer is applied to the fresh one.
pub struct ConnectionWrapper {
    peer_id: PeerId,
    config: TransportConfig,
    event_tx: mpsc::Sender<TransportEvent>,
    peer_connection: RwLock<Arc<RTCPeerConnection>>,
    local_tracks: Mutex<Vec<Arc<dyn TrackLocal + Send + Sync>>>,
}

impl ConnectionWrapper {
    /// Creates the peer connection and wires its callbacks into `event_tx`.
    pub async fn new(
        peer_id: PeerId,
        config: TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let peer_connection = Self::build(&peer_id, &config, &event_tx).await?;
        Self::watch_negotiation(&peer_connection, &event_tx);

        Ok(Self {
            peer_id,
            config,
            event_tx,
            peer_connection: RwLock::new(peer_connection),
            local_tracks: Mutex::new(Vec::new()),
        })
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// The current peer connection. Replaced on every offer collision.
    pub fn peer_connection(&self) -> Arc<RTCPeerConnection> {
        self.peer_connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn build(
        peer_id: &PeerId,
        config: &TransportConfig,
        event_tx: &mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<RTCPeerConnection>> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        let uid_state = peer_id.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let uid = uid_state.clone();
                Box::pin(async move {
                    info!("Peer Connection State changed for {:?}: {:?}", uid, s);
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let uid_ice = peer_id.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let uid = uid_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let init = match candidate.to_json() {
                    Ok(init) => init,
                    Err(e) => {
                        warn!("Failed to encode local candidate for {:?}: {:?}", uid, e);
                        return;
                    }
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid.filter(|mid| !mid.is_empty()),
                };
                let _ = tx.send(TransportEvent::CandidateGenerated(candidate)).await;
            })
        }));

        let track_tx = event_tx.clone();
        let uid_track = peer_id.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let uid = uid_track.clone();

                Box::pin(async move {
                    debug!(
                        "Remote track {:?} ({:?}) from {:?}",
                        track.id(),
                        track.kind(),
                        uid
                    );
                    let _ = tx
                        .send(TransportEvent::TrackReceived(MediaTrack::remote(track)))
                        .await;
                })
            },
        ));

        let ice_state_tx = event_tx.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                let tx = ice_state_tx.clone();
                Box::pin(async move {
                    let _ = tx
                        .send(TransportEvent::ConnectionStateChanged(Self::ice_state(s)))
                        .await;
                })
            },
        ));

        Ok(peer_connection)
    }

    fn watch_negotiation(
        peer_connection: &RTCPeerConnection,
        event_tx: &mpsc::Sender<TransportEvent>,
    ) {
        let negotiation_tx = event_tx.clone();
        peer_connection.on_negotiation_needed(Box::new(move || {
            let tx = negotiation_tx.clone();
            Box::pin(async move {
                let _ = tx.send(TransportEvent::NegotiationNeeded).await;
            })
        }));
    }

    /// Swaps in a fresh peer connection carrying the same local tracks and
    /// closes the old one without letting it report anything further.
    ///
    /// The fresh connection does not report negotiation-needed until
    /// [`watch_negotiation`](Self::watch_negotiation) is called, so re-adding
    /// the tracks cannot start a competing offer.
    async fn rebuild(&self) -> Result<Arc<RTCPeerConnection>> {
        let fresh = Self::build(&self.peer_id, &self.config, &self.event_tx).await?;

        let tracks = self
            .local_tracks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for track in tracks {
            Self::send_track(&fresh, track).await?;
        }

        let stale = std::mem::replace(
            &mut *self
                .peer_connection
                .write()
                .unwrap_or_else(PoisonError::into_inner),
            fresh.clone(),
        );
        stale.on_negotiation_needed(Box::new(|| Box::pin(async {})));
        stale.on_ice_candidate(Box::new(|_: Option<RTCIceCandidate>| Box::pin(async {})));
        stale.on_ice_connection_state_change(Box::new(|_: RTCIceConnectionState| {
            Box::pin(async {})
        }));
        stale.on_track(Box::new(
            |_: Arc<TrackRemote>, _: Arc<RTCRtpReceiver>, _: Arc<RTCRtpTransceiver>| {
                Box::pin(async {})
            },
        ));
        if let Err(e) = stale.close().await {
            warn!("Failed to close replaced connection for {:?}: {:?}", self.peer_id, e);
        }

        Ok(fresh)
    }

    async fn send_track(
        peer_connection: &RTCPeerConnection,
        track: Arc<dyn TrackLocal + Send + Sync>,
    ) -> Result<()> {
        let track_id = track.id().to_owned();
        let sender = peer_connection
            .add_track(track)
            .await
            .with_context(|| format!("Failed to add track {}", track_id))?;

        // Incoming RTCP must be drained for interceptors to work.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });
        Ok(())
    }

    fn ice_state(state: RTCIceConnectionState) -> IceConnectionState {
        match state {
            RTCIceConnectionState::Unspecified | RTCIceConnectionState::New => {
                IceConnectionState::New
            }
            RTCIceConnectionState::Checking => IceConnectionState::Checking,
            RTCIceConnectionState::Connected => IceConnectionState::Connected,
            RTCIceConnectionState::Completed => IceConnectionState::Completed,
            RTCIceConnectionState::Disconnected => IceConnectionState::Disconnected,
            RTCIceConnectionState::Failed => IceConnectionState::Failed,
            RTCIceConnectionState::Closed => IceConnectionState::Closed,
        }
    }

    fn to_rtc(description: SessionDescription) -> Result<RTCSessionDescription> {
        let desc = match description.sdp_type {
            SdpType::Offer => RTCSessionDescription::offer(description.sdp)?,
            SdpType::Answer => RTCSessionDescription::answer(description.sdp)?,
        };
        Ok(desc)
    }

    fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription> {
        match desc.sdp_type {
            RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp)),
            RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp)),
            other => bail!("Unsupported local description type {}", other),
        }
    }
}

#[async_trait]
impl MediaTransport for ConnectionWrapper {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection().create_offer(None).await?;
        Self::from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection().create_answer(None).await?;
        Self::from_rtc(answer)
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        let desc = Self::to_rtc(description)?;
        self.peer_connection().set_local_description(desc).await?;
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let is_offer = description.sdp_type == SdpType::Offer;
        let desc = Self::to_rtc(description)?;

        let mut peer_connection = self.peer_connection();
        let rebuilt =
            is_offer && peer_connection.signaling_state() == RTCSignalingState::HaveLocalOffer;
        if rebuilt {
            debug!("Discarding local offer for {:?}", self.peer_id);
            peer_connection = self
                .rebuild()
                .await
                .context("Failed to discard local offer")?;
        }

        let applied = peer_connection.set_remote_description(desc).await;
        if rebuilt {
            Self::watch_negotiation(&peer_connection, &self.event_tx);
        }
        applied?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            ..Default::default()
        };
        self.peer_connection().add_ice_candidate(init).await?;
        Ok(())
    }

    async fn add_track(&self, track: MediaTrack) -> Result<()> {
        let TrackSource::Local(local) = track.source() else {
            bail!("Cannot send remote track {}", track.id());
        };

        Self::send_track(&self.peer_connection(), local.clone()).await?;
        self.local_tracks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(local.clone());
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        match self.peer_connection().signaling_state() {
            RTCSignalingState::Unspecified | RTCSignalingState::Stable => SignalingState::Stable,
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingState::Closed,
        }
    }

    /// Regenerates the ICE credentials; the next offer carries them.
    async fn restart_ice(&self) -> Result<bool> {
        if let Err(e) = self.peer_connection().restart_ice().await {
            warn!(
                "ICE restart for {:?} not possible, renegotiating instead: {}",
                self.peer_id, e
            );
            return Ok(false);
        }

        // The engine only flags negotiation when transceivers change.
        if self.event_tx.try_send(TransportEvent::NegotiationNeeded).is_err() {
            debug!("Negotiation for {:?} already pending", self.peer_id);
        }
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection().close().await?;
        Ok(())
    }
}

/// Builds a [`ConnectionWrapper`] per remote peer from a shared config.
#[derive(Debug, Clone, Default)]
pub struct WebRtcTransportFactory {
    config: TransportConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MediaTransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        peer_id: &PeerId,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn MediaTransport>> {
        let wrapper = ConnectionWrapper::new(peer_id.clone(), self.config.clone(), event_tx).await?;
        Ok(Arc::new(wrapper))
    }
}
