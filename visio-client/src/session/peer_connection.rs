use crate::media::MediaStream;
use crate::negotiation::Negotiator;
use crate::session::{LocalMedia, SessionEvent};
use crate::transport::TransportEvent;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use visio_core::{Message, PeerId};

/// Resolves with the remote peer's stream, or `None` if the peer went away
/// before any media arrived.
pub type RemoteStream = BoxFuture<'static, Option<MediaStream>>;

/// Everything the session keeps for one remote participant.
///
/// Runs two tasks: one feeding inbound signaling messages to the negotiator
/// in arrival order, one handling transport notifications.
pub struct PeerConnection {
    negotiator: Arc<Negotiator>,
    inbox: mpsc::UnboundedSender<Message>,
    remote_stream: watch::Receiver<Option<MediaStream>>,
    tasks: Vec<JoinHandle<()>>,
}

impl PeerConnection {
    /// `inbox` may already hold messages; they are handled first.
    pub fn spawn(
        negotiator: Arc<Negotiator>,
        inbox: mpsc::UnboundedSender<Message>,
        mut inbox_rx: mpsc::UnboundedReceiver<Message>,
        mut transport_rx: mpsc::Receiver<TransportEvent>,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let (stream_tx, remote_stream) = watch::channel(None::<MediaStream>);

        let inbox_task = tokio::spawn({
            let negotiator = negotiator.clone();
            async move {
                while let Some(message) = inbox_rx.recv().await {
                    if negotiator.is_closed() {
                        break;
                    }
                    match message.signal() {
                        Ok(signal) => negotiator.handle_signal(signal).await,
                        Err(e) => warn!("Ignoring message from {:?}: {}", message.id, e),
                    }
                }
            }
        });

        let transport_task = tokio::spawn({
            let negotiator = negotiator.clone();
            async move {
                while let Some(event) = transport_rx.recv().await {
                    if negotiator.is_closed() {
                        break;
                    }
                    match event {
                        TransportEvent::NegotiationNeeded => {
                            if let Err(e) = negotiator.negotiate().await {
                                error!("Negotiation with {:?} failed: {}", negotiator.peer_id(), e);
                            }
                        }
                        TransportEvent::CandidateGenerated(candidate) => {
                            negotiator.send_local_candidate(candidate).await;
                        }
                        TransportEvent::ConnectionStateChanged(state) => {
                            debug!("ICE state for {:?}: {:?}", negotiator.peer_id(), state);
                            if let Err(e) = negotiator.handle_connection_state(state).await {
                                error!("ICE recovery for {:?} failed: {}", negotiator.peer_id(), e);
                            }
                        }
                        TransportEvent::TrackReceived(track) => {
                            let current = stream_tx.borrow().clone();
                            match current {
                                Some(stream) => stream.add_track(track).await,
                                None => {
                                    let stream = MediaStream::with_tracks(
                                        track.stream_id().to_owned(),
                                        vec![track],
                                    );
                                    stream_tx.send_replace(Some(stream.clone()));
                                    let _ = events_tx.send(SessionEvent::RemoteStream {
                                        peer_id: negotiator.peer_id().clone(),
                                        stream,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        });

        Self {
            negotiator,
            inbox,
            remote_stream,
            tasks: vec![inbox_task, transport_task],
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        self.negotiator.peer_id()
    }

    pub fn negotiator(&self) -> &Arc<Negotiator> {
        &self.negotiator
    }

    pub fn deliver(&self, message: Message) {
        if self.inbox.send(message).is_err() {
            debug!("Inbox of {:?} is closed", self.peer_id());
        }
    }

    pub fn remote_stream(&self) -> RemoteStream {
        let mut remote_stream = self.remote_stream.clone();
        Box::pin(async move {
            let stream = remote_stream.wait_for(Option::is_some).await.ok()?;
            (*stream).clone()
        })
    }

    /// Adds the local tracks to the transport once the local stream is ready.
    pub fn attach_media(&mut self, media: Arc<LocalMedia>) {
        let negotiator = self.negotiator.clone();
        self.tasks.push(tokio::spawn(async move {
            match media.stream().await {
                Ok(stream) => {
                    if let Err(e) = negotiator.attach(&stream).await {
                        error!("Failed to attach media for {:?}: {}", negotiator.peer_id(), e);
                    }
                }
                Err(e) => warn!("No local media for {:?}: {}", negotiator.peer_id(), e),
            }
        }));
    }

    pub async fn close(self) {
        self.negotiator.close().await;
        for task in self.tasks {
            task.abort();
        }
    }
}
