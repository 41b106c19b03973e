use crate::error::SessionError;
use crate::media::{MediaSource, MediaStream};
use crate::negotiation::Negotiator;
use crate::session::{
    LocalMedia, PeerConnection, RemoteStream, SessionCommand, SessionConfig, SessionEvent,
};
use crate::signaling::{SignalingChannel, SignalingTransport};
use crate::transport::MediaTransportFactory;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use visio_core::{Message, MessageKind, PeerId, Role, Signal};

struct SessionInner {
    signaling: SignalingChannel,
    media: Arc<LocalMedia>,
    local_id: watch::Receiver<Option<PeerId>>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
}

/// Handle to a running call session.
///
/// The session owns the signaling channel and one [`PeerConnection`] per
/// remote participant. Peers come and go as the server announces them;
/// lifecycle changes are reported on the [`SessionEvent`] receiver returned by
/// [`Session::new`]. Handles are cheap to clone; the session stops once the
/// last one is dropped or [`close`](Self::close) is called.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Starts the session loop. Must be called inside a Tokio runtime.
    pub fn new(
        config: SessionConfig,
        signaling_transport: Arc<dyn SignalingTransport>,
        transport_factory: Arc<dyn MediaTransportFactory>,
        media_source: Arc<dyn MediaSource>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (local_id_tx, local_id) = watch::channel(None);

        let signaling = SignalingChannel::new(
            signaling_transport,
            control_tx,
            config.reconnect.initial_backoff(),
        );
        let media = Arc::new(LocalMedia::new(media_source, config.media));

        let session_loop = SessionLoop {
            signaling: signaling.clone(),
            media: media.clone(),
            transport_factory,
            local_id_tx,
            local_id: None,
            peers: HashMap::new(),
            control_rx,
            backlog: VecDeque::new(),
            command_rx,
            events_tx,
        };
        tokio::spawn(session_loop.run());

        let session = Self {
            inner: Arc::new(SessionInner {
                signaling,
                media,
                local_id,
                command_tx,
            }),
        };
        (session, events_rx)
    }

    pub async fn connect_signaling(&self, address: impl Into<String>) {
        self.inner.signaling.connect(address).await;
    }

    pub async fn disconnect_signaling(&self) {
        self.inner.signaling.disconnect().await;
    }

    pub fn signaling(&self) -> &SignalingChannel {
        &self.inner.signaling
    }

    /// Id assigned by the server. Waits for the first `register`.
    pub async fn local_id(&self) -> Result<PeerId, SessionError> {
        let mut local_id = self.inner.local_id.clone();
        let id = local_id
            .wait_for(Option::is_some)
            .await
            .map_err(|_| SessionError::Closed)?;
        (*id).clone().ok_or(SessionError::Closed)
    }

    pub async fn local_stream(&self) -> Result<MediaStream, SessionError> {
        self.inner.media.stream().await
    }

    /// The remote stream future of `peer_id`, if the peer is known.
    pub async fn remote_stream(&self, peer_id: &PeerId) -> Option<RemoteStream> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::RemoteStream {
            peer_id: peer_id.clone(),
            reply,
        });
        rx.await.ok().flatten()
    }

    pub async fn peers(&self) -> Vec<PeerId> {
        let (reply, rx) = oneshot::channel();
        self.command(SessionCommand::Peers { reply });
        rx.await.unwrap_or_default()
    }

    /// Disconnects signaling and closes every peer.
    pub async fn close(&self) {
        let (done, rx) = oneshot::channel();
        self.command(SessionCommand::Close { done });
        let _ = rx.await;
    }

    fn command(&self, command: SessionCommand) {
        if self.inner.command_tx.send(command).is_err() {
            debug!("Session loop already stopped");
        }
    }
}

struct SessionLoop {
    signaling: SignalingChannel,
    media: Arc<LocalMedia>,
    transport_factory: Arc<dyn MediaTransportFactory>,
    local_id_tx: watch::Sender<Option<PeerId>>,
    local_id: Option<PeerId>,
    peers: HashMap<PeerId, PeerConnection>,
    control_rx: mpsc::UnboundedReceiver<Message>,
    /// Control messages taken off `control_rx` early, still to be handled.
    backlog: VecDeque<Message>,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionLoop {
    async fn run(mut self) {
        info!("Session event loop started");

        loop {
            if let Some(message) = self.backlog.pop_front() {
                self.handle_message(message).await;
                continue;
            }

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => {
                            if !self.handle_command(c).await {
                                break;
                            }
                        }
                        None => {
                            info!("All session handles dropped. Shutting down.");
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                msg = self.control_rx.recv() => {
                    match msg {
                        Some(m) => self.handle_message(m).await,
                        None => {
                            warn!("Signaling channel closed unexpectedly");
                            self.shutdown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!("Session event loop finished");
    }

    /// Returns `false` once the loop should stop.
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Peers { reply } => {
                let mut peers: Vec<PeerId> = self.peers.keys().cloned().collect();
                peers.sort();
                let _ = reply.send(peers);
            }
            SessionCommand::RemoteStream { peer_id, reply } => {
                let stream = self.peers.get(&peer_id).map(PeerConnection::remote_stream);
                let _ = reply.send(stream);
            }
            SessionCommand::Close { done } => {
                info!("Closing session");
                self.shutdown().await;
                let _ = done.send(());
                return false;
            }
        }
        true
    }

    async fn handle_message(&mut self, message: Message) {
        let signal = match message.signal() {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Ignoring message from {:?}: {}", message.id, e);
                return;
            }
        };

        match signal {
            Signal::Register => self.register(message.id),
            Signal::Join => self.ensure_peer(&message.id, None).await,
            Signal::Leave => self.remove_peer(&message.id).await,
            Signal::Description(_) | Signal::Candidate(_) => {
                let peer_id = message.id.clone();
                self.ensure_peer(&peer_id, Some(message)).await;
            }
            Signal::Error(code) => error!("Error: {}", code.description()),
        }
    }

    fn register(&mut self, id: PeerId) {
        if let Some(local_id) = &self.local_id {
            warn!(
                "Ignoring register as {:?}, already registered as {:?}",
                id, local_id
            );
            return;
        }

        info!("Registered as {:?}", id);
        self.local_id = Some(id.clone());
        self.local_id_tx.send_replace(Some(id));
    }

    /// Creates the record for `peer_id` if needed and hands it `first`.
    ///
    /// The inbox is registered with the channel before the transport is
    /// created, and every message for `peer_id` still waiting in the control
    /// queue is moved into it, so the peer sees its messages in arrival order
    /// however long creation takes.
    async fn ensure_peer(&mut self, peer_id: &PeerId, first: Option<Message>) {
        let Some(local_id) = self.local_id.clone() else {
            warn!("Message from {:?} before registration, ignoring", peer_id);
            return;
        };
        if *peer_id == local_id {
            debug!("Ignoring message about ourselves");
            return;
        }

        if let Some(peer) = self.peers.get(peer_id) {
            if let Some(message) = first {
                peer.deliver(message);
            }
            return;
        }

        let (inbox, inbox_rx) = mpsc::unbounded_channel();
        if let Some(message) = first {
            let _ = inbox.send(message);
        }
        self.signaling.register(peer_id.clone(), inbox.clone());
        self.claim_queued(peer_id, &inbox);

        let (transport_tx, transport_rx) = mpsc::channel(256);
        let transport = match self.transport_factory.create(peer_id, transport_tx).await {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to create transport for {:?}: {:?}", peer_id, e);
                self.signaling.unregister(peer_id);
                return;
            }
        };

        let role = Role::for_pair(&local_id, peer_id);
        info!("Peer {:?} joined, we are {:?}", peer_id, role);

        let negotiator = Arc::new(Negotiator::new(
            peer_id.clone(),
            role,
            transport,
            Arc::new(self.signaling.clone()),
        ));
        let mut peer = PeerConnection::spawn(
            negotiator,
            inbox,
            inbox_rx,
            transport_rx,
            self.events_tx.clone(),
        );
        peer.attach_media(self.media.clone());

        self.peers.insert(peer_id.clone(), peer);
        let _ = self.events_tx.send(SessionEvent::PeerJoined(peer_id.clone()));
    }

    /// Moves queued messages for `peer_id` into `inbox`, keeping the rest in
    /// order for the loop.
    fn claim_queued(&mut self, peer_id: &PeerId, inbox: &mpsc::UnboundedSender<Message>) {
        let mut queued = std::mem::take(&mut self.backlog);
        while let Ok(message) = self.control_rx.try_recv() {
            queued.push_back(message);
        }

        for message in queued {
            if message.id == *peer_id && message.kind != MessageKind::Leave {
                let _ = inbox.send(message);
            } else {
                self.backlog.push_back(message);
            }
        }
    }

    async fn remove_peer(&mut self, peer_id: &PeerId) {
        let Some(peer) = self.peers.remove(peer_id) else {
            debug!("Leave for unknown peer {:?}", peer_id);
            return;
        };

        info!("Peer {:?} left", peer_id);
        self.signaling.unregister(peer_id);
        peer.close().await;
        let _ = self.events_tx.send(SessionEvent::PeerLeft(peer_id.clone()));
    }

    async fn shutdown(&mut self) {
        self.signaling.disconnect().await;

        for (peer_id, peer) in std::mem::take(&mut self.peers) {
            self.signaling.unregister(&peer_id);
            peer.close().await;
            let _ = self.events_tx.send(SessionEvent::PeerLeft(peer_id));
        }
    }
}
