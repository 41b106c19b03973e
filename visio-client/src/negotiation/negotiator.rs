use crate::error::NegotiationError;
use crate::media::MediaStream;
use crate::signaling::SignalingOutput;
use crate::transport::{IceConnectionState, MediaTransport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};
use visio_core::{
    IceCandidate, Message, PeerId, Role, SdpType, SessionDescription, Signal, SignalingState,
};

/// Perfect-negotiation state machine for one remote peer.
///
/// Both ends may start an offer at any time. When offers collide, the
/// impolite side drops the remote offer and the polite side rolls its own
/// back and answers, so the pair always converges on a single exchange.
///
/// Every handler re-checks [`is_closed`](Self::is_closed) after each await,
/// so [`close`](Self::close) may run concurrently with an exchange.
pub struct Negotiator {
    peer_id: PeerId,
    role: Role,
    transport: Arc<dyn MediaTransport>,
    signaling: Arc<dyn SignalingOutput>,
    making_offer: AtomicBool,
    ignoring_offer: AtomicBool,
    setting_remote_answer: AtomicBool,
    closed: AtomicBool,
}

impl Negotiator {
    pub fn new(
        peer_id: PeerId,
        role: Role,
        transport: Arc<dyn MediaTransport>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            peer_id,
            role,
            transport,
            signaling,
            making_offer: AtomicBool::new(false),
            ignoring_offer: AtomicBool::new(false),
            setting_remote_answer: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn signaling_state(&self) -> SignalingState {
        self.transport.signaling_state()
    }

    pub fn is_making_offer(&self) -> bool {
        self.making_offer.load(Ordering::SeqCst)
    }

    pub fn is_ignoring_offer(&self) -> bool {
        self.ignoring_offer.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Runs the offer side of an exchange. Called when the transport reports
    /// that negotiation is needed.
    pub async fn negotiate(&self) -> Result<(), NegotiationError> {
        if self.is_closed() {
            return Ok(());
        }

        self.making_offer.store(true, Ordering::SeqCst);
        let result = self.make_offer().await;
        self.making_offer.store(false, Ordering::SeqCst);
        result
    }

    async fn make_offer(&self) -> Result<(), NegotiationError> {
        let offer = self
            .transport
            .create_offer()
            .await
            .map_err(NegotiationError::Offer)?;

        if self.is_closed() {
            return Ok(());
        }
        let state = self.transport.signaling_state();
        if state != SignalingState::Stable {
            debug!(
                "Dropping offer for {:?}: signaling state is {:?}",
                self.peer_id, state
            );
            return Ok(());
        }

        self.transport
            .set_local_description(offer.clone())
            .await
            .map_err(NegotiationError::LocalDescription)?;

        if self.is_closed() {
            return Ok(());
        }
        self.signaling
            .send(Message::description(&self.peer_id, &offer))
            .await;
        Ok(())
    }

    pub async fn handle_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), NegotiationError> {
        if self.is_closed() {
            return Ok(());
        }

        let is_offer = description.sdp_type == SdpType::Offer;
        let ready_for_offer = !self.making_offer.load(Ordering::SeqCst)
            && (self.transport.signaling_state() == SignalingState::Stable
                || self.setting_remote_answer.load(Ordering::SeqCst));
        let offer_collision = is_offer && !ready_for_offer;

        let ignoring = self.role == Role::Impolite && offer_collision;
        self.ignoring_offer.store(ignoring, Ordering::SeqCst);
        if ignoring {
            debug!("Ignoring colliding offer from {:?}", self.peer_id);
            return Ok(());
        }
        if offer_collision {
            debug!("Offer collision with {:?}, rolling back", self.peer_id);
        }

        self.setting_remote_answer.store(!is_offer, Ordering::SeqCst);
        let applied = self.transport.set_remote_description(description).await;
        self.setting_remote_answer.store(false, Ordering::SeqCst);
        applied.map_err(NegotiationError::RemoteDescription)?;

        if !is_offer || self.is_closed() {
            return Ok(());
        }

        let answer = self
            .transport
            .create_answer()
            .await
            .map_err(NegotiationError::Answer)?;
        if self.is_closed() {
            return Ok(());
        }

        self.transport
            .set_local_description(answer.clone())
            .await
            .map_err(NegotiationError::LocalDescription)?;
        if self.is_closed() {
            return Ok(());
        }

        self.signaling
            .send(Message::description(&self.peer_id, &answer))
            .await;
        Ok(())
    }

    pub async fn handle_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        if self.is_closed() {
            return Ok(());
        }

        match self.transport.add_ice_candidate(candidate).await {
            Ok(()) => Ok(()),
            Err(e) if self.is_ignoring_offer() => {
                debug!(
                    "Dropped candidate from {:?} belonging to an ignored offer: {:#}",
                    self.peer_id, e
                );
                Ok(())
            }
            Err(e) => Err(NegotiationError::Candidate(e)),
        }
    }

    /// Forwards a locally gathered candidate to the remote peer.
    pub async fn send_local_candidate(&self, candidate: IceCandidate) {
        if self.is_closed() {
            return;
        }
        self.signaling
            .send(Message::candidate(&self.peer_id, &candidate))
            .await;
    }

    pub async fn handle_connection_state(
        &self,
        state: IceConnectionState,
    ) -> Result<(), NegotiationError> {
        if state != IceConnectionState::Failed || self.is_closed() {
            return Ok(());
        }

        info!("Connectivity to {:?} failed, restarting ICE", self.peer_id);
        let restarted = self
            .transport
            .restart_ice()
            .await
            .map_err(NegotiationError::Restart)?;
        if !restarted {
            self.negotiate().await?;
        }
        Ok(())
    }

    /// Adds every track of `stream` to the transport.
    pub async fn attach(&self, stream: &MediaStream) -> Result<(), NegotiationError> {
        for track in stream.tracks().await {
            if self.is_closed() {
                return Ok(());
            }
            self.transport
                .add_track(track)
                .await
                .map_err(NegotiationError::Track)?;
        }
        Ok(())
    }

    /// Handles one inbound signal addressed to this peer. Faults are logged
    /// and never propagate.
    pub async fn handle_signal(&self, signal: Signal) {
        let result = match signal {
            Signal::Description(description) => self.handle_description(description).await,
            Signal::Candidate(candidate) => self.handle_candidate(candidate).await,
            Signal::Error(code) => {
                error!(
                    "Signaling error for {:?}: {}",
                    self.peer_id,
                    code.description()
                );
                Ok(())
            }
            Signal::Join => {
                debug!("Repeated join from {:?}", self.peer_id);
                Ok(())
            }
            Signal::Register | Signal::Leave => {
                warn!("Unexpected control message routed to {:?}", self.peer_id);
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("Negotiation with {:?} failed: {}", self.peer_id, e);
        }
    }

    /// Releases the transport. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport for {:?}: {:?}", self.peer_id, e);
        }
    }
}
