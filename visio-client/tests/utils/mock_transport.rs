use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use visio_client::{MediaTrack, MediaTransport, MediaTransportFactory, TransportEvent};
use visio_core::{IceCandidate, PeerId, SdpType, SessionDescription, SignalingState};

#[derive(Debug)]
struct FakeState {
    signaling_state: SignalingState,
    local: Option<SessionDescription>,
    remote: Option<SessionDescription>,
    candidates: Vec<IceCandidate>,
    tracks: Vec<String>,
    offers_created: usize,
    restarts: usize,
    closed: bool,
}

/// In-memory engine following the offer/answer state machine, including the
/// implicit rollback of a local offer when a remote offer arrives.
pub struct FakeTransport {
    label: String,
    state: Mutex<FakeState>,
    event_tx: mpsc::Sender<TransportEvent>,
    offer_gate: Option<Arc<Notify>>,
    supports_restart: bool,
    fail_candidates: AtomicBool,
}

impl FakeTransport {
    pub fn new(label: impl Into<String>, event_tx: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(FakeState {
                signaling_state: SignalingState::Stable,
                local: None,
                remote: None,
                candidates: Vec::new(),
                tracks: Vec::new(),
                offers_created: 0,
                restarts: 0,
                closed: false,
            }),
            event_tx,
            offer_gate: None,
            supports_restart: false,
            fail_candidates: AtomicBool::new(false),
        }
    }

    /// `create_offer` waits for one permit of `gate`.
    pub fn with_offer_gate(mut self, gate: Arc<Notify>) -> Self {
        self.offer_gate = Some(gate);
        self
    }

    pub fn with_restart_support(mut self) -> Self {
        self.supports_restart = true;
        self
    }

    pub fn fail_candidates(&self, fail: bool) {
        self.fail_candidates.store(fail, Ordering::SeqCst);
    }

    /// Pushes a notification as the engine would.
    pub async fn emit(&self, event: TransportEvent) {
        let _ = self.event_tx.send(event).await;
    }

    pub fn local(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().local.clone()
    }

    pub fn remote(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().remote.clone()
    }

    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.state.lock().unwrap().candidates.clone()
    }

    pub fn tracks(&self) -> Vec<String> {
        self.state.lock().unwrap().tracks.clone()
    }

    pub fn offers_created(&self) -> usize {
        self.state.lock().unwrap().offers_created
    }

    pub fn restarts(&self) -> usize {
        self.state.lock().unwrap().restarts
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl MediaTransport for FakeTransport {
    async fn create_offer(&self) -> Result<SessionDescription> {
        if let Some(gate) = &self.offer_gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        state.offers_created += 1;
        Ok(SessionDescription::offer(format!(
            "offer-{}-{}",
            self.label, state.offers_created
        )))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let state = self.state.lock().unwrap();
        if state.signaling_state != SignalingState::HaveRemoteOffer {
            bail!("no remote offer to answer");
        }
        Ok(SessionDescription::answer(format!("answer-{}", self.label)))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let next = match (state.signaling_state, description.sdp_type) {
            (SignalingState::Stable, SdpType::Offer) => SignalingState::HaveLocalOffer,
            (SignalingState::HaveRemoteOffer, SdpType::Answer) => SignalingState::Stable,
            (current, sdp_type) => bail!("cannot apply local {} in {:?}", sdp_type, current),
        };
        state.signaling_state = next;
        state.local = Some(description);
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let next = match (state.signaling_state, description.sdp_type) {
            (SignalingState::Stable, SdpType::Offer) => SignalingState::HaveRemoteOffer,
            (SignalingState::HaveLocalOffer, SdpType::Offer) => {
                state.local = None;
                SignalingState::HaveRemoteOffer
            }
            (SignalingState::HaveLocalOffer, SdpType::Answer) => SignalingState::Stable,
            (current, sdp_type) => bail!("cannot apply remote {} in {:?}", sdp_type, current),
        };
        state.signaling_state = next;
        state.remote = Some(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if self.fail_candidates.load(Ordering::SeqCst) || state.remote.is_none() {
            bail!("no remote description for candidate");
        }
        state.candidates.push(candidate);
        Ok(())
    }

    async fn add_track(&self, track: MediaTrack) -> Result<()> {
        let first = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                bail!("transport closed");
            }
            state.tracks.push(track.id().to_owned());
            state.tracks.len() == 1
        };

        if first {
            self.emit(TransportEvent::NegotiationNeeded).await;
        }
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        self.state.lock().unwrap().signaling_state
    }

    async fn restart_ice(&self) -> Result<bool> {
        if !self.supports_restart {
            return Ok(false);
        }
        self.state.lock().unwrap().restarts += 1;
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.signaling_state = SignalingState::Closed;
        Ok(())
    }
}

/// Factory handing out [`FakeTransport`]s and remembering them by peer.
#[derive(Default)]
pub struct FakeTransportFactory {
    transports: Mutex<HashMap<PeerId, Arc<FakeTransport>>>,
    created: AtomicUsize,
    create_delay: Duration,
}

impl FakeTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create` takes `delay`, like a real engine setting up.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    pub fn transport(&self, peer_id: &PeerId) -> Option<Arc<FakeTransport>> {
        self.transports.lock().unwrap().get(peer_id).cloned()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaTransportFactory for FakeTransportFactory {
    async fn create(
        &self,
        peer_id: &PeerId,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn MediaTransport>> {
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }

        let transport = Arc::new(FakeTransport::new(peer_id.to_string(), event_tx));
        self.transports
            .lock()
            .unwrap()
            .insert(peer_id.clone(), transport.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(transport)
    }
}
