use crate::signaling::{Backoff, SignalingOutput, SignalingTransport, TransportLink};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use visio_core::{Message, MessageKind, PeerId};

struct ChannelState {
    address: Option<String>,
    link: Option<mpsc::UnboundedSender<String>>,
    queue: VecDeque<String>,
    backoff: Backoff,
    driver: Option<JoinHandle<()>>,
}

struct ChannelInner {
    transport: Arc<dyn SignalingTransport>,
    handlers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
    default_handler: mpsc::UnboundedSender<Message>,
    state: Mutex<ChannelState>,
}

/// Reconnecting message bus to the signaling server.
///
/// Outgoing frames are queued while the link is down and flushed, in order,
/// as soon as it comes back. Incoming frames go to the handler registered for
/// their id, or to the default handler. `leave` always goes to the default
/// handler.
#[derive(Clone)]
pub struct SignalingChannel {
    inner: Arc<ChannelInner>,
}

impl SignalingChannel {
    pub fn new(
        transport: Arc<dyn SignalingTransport>,
        default_handler: mpsc::UnboundedSender<Message>,
        initial_backoff: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                transport,
                handlers: DashMap::new(),
                default_handler,
                state: Mutex::new(ChannelState {
                    address: None,
                    link: None,
                    queue: VecDeque::new(),
                    backoff: Backoff::new(initial_backoff),
                    driver: None,
                }),
            }),
        }
    }

    /// Starts connecting to `address`, replacing any current connection.
    pub async fn connect(&self, address: impl Into<String>) {
        let address = address.into();
        let mut state = self.inner.state.lock().await;

        if let Some(driver) = state.driver.take() {
            driver.abort();
        }
        state.link = None;
        state.address = Some(address.clone());

        info!("Connecting signaling channel to {}", address);
        state.driver = Some(tokio::spawn(drive(Arc::downgrade(&self.inner), address)));
    }

    /// Closes the link and stops reconnecting until the next `connect`.
    pub async fn disconnect(&self) {
        let mut state = self.inner.state.lock().await;

        if let Some(driver) = state.driver.take() {
            driver.abort();
        }
        state.link = None;
        if let Some(address) = state.address.take() {
            info!("Signaling channel to {} disconnected", address);
        }
    }

    pub async fn send(&self, message: Message) {
        let frame = message.serialize();
        let mut state = self.inner.state.lock().await;

        let frame = match state.link.as_ref().map(|link| link.send(frame.clone())) {
            Some(Ok(())) => return,
            Some(Err(_)) => {
                debug!("Signaling link dropped while sending, queueing");
                state.link = None;
                frame
            }
            None => frame,
        };
        state.queue.push_back(frame);
    }

    /// Routes messages carrying `id` to `handler`, replacing any prior one.
    pub fn register(&self, id: PeerId, handler: mpsc::UnboundedSender<Message>) {
        self.inner.handlers.insert(id, handler);
    }

    pub fn unregister(&self, id: &PeerId) {
        self.inner.handlers.remove(id);
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.state.lock().await.link.is_some()
    }

    /// Upper bound of the delay before the next reconnect attempt.
    pub async fn backoff_bound(&self) -> Duration {
        self.inner.state.lock().await.backoff.bound()
    }
}

impl ChannelInner {
    /// Routes `message` to its id's handler, or to the default handler.
    ///
    /// The handler table entry stays locked until the message is queued, so a
    /// concurrent [`SignalingChannel::register`] completes either before or
    /// after the whole dispatch.
    fn dispatch(&self, message: Message) {
        if message.kind == MessageKind::Leave {
            self.dispatch_default(message);
            return;
        }

        match self.handlers.entry(message.id.clone()) {
            Entry::Occupied(entry) => {
                if let Err(mpsc::error::SendError(message)) = entry.get().send(message) {
                    debug!("Handler for {:?} is gone, using default", message.id);
                    self.dispatch_default(message);
                    entry.remove();
                }
            }
            Entry::Vacant(_vacant) => self.dispatch_default(message),
        }
    }

    fn dispatch_default(&self, message: Message) {
        if let Err(e) = self.default_handler.send(message) {
            debug!(
                "Dropping {} message from {:?}: default handler gone",
                e.0.kind, e.0.id
            );
        }
    }

    /// Installs a fresh link: flushes the queue into it first so that no
    /// newer send can overtake queued frames.
    async fn attach(&self, sender: mpsc::UnboundedSender<String>) {
        let mut state = self.state.lock().await;

        while let Some(frame) = state.queue.pop_front() {
            if let Err(e) = sender.send(frame) {
                state.queue.push_front(e.0);
                break;
            }
        }

        state.link = Some(sender);
        state.backoff.reset();
    }

    async fn detach(&self) {
        self.state.lock().await.link = None;
    }

    async fn next_delay(&self) -> Duration {
        self.state.lock().await.backoff.next_delay()
    }
}

async fn drive(inner: Weak<ChannelInner>, address: String) {
    loop {
        let Some(transport) = inner.upgrade().map(|channel| channel.transport.clone()) else {
            return;
        };

        match transport.open(&address).await {
            Ok(link) => {
                if !serve(&inner, &address, link).await {
                    return;
                }
            }
            Err(e) => warn!("Signaling connection to {} failed: {:?}", address, e),
        }

        let Some(channel) = inner.upgrade() else {
            return;
        };
        let delay = channel.next_delay().await;
        drop(channel);

        info!("Reconnecting signaling channel in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

/// Pumps one open link until it closes. Returns `false` once the channel
/// itself is gone.
async fn serve(inner: &Weak<ChannelInner>, address: &str, link: TransportLink) -> bool {
    let TransportLink {
        sender,
        mut receiver,
    } = link;

    let Some(channel) = inner.upgrade() else {
        return false;
    };
    channel.attach(sender).await;
    drop(channel);
    info!("Signaling channel open: {}", address);

    while let Some(frame) = receiver.recv().await {
        let Some(channel) = inner.upgrade() else {
            return false;
        };
        channel.dispatch(Message::deserialize(&frame));
    }

    let Some(channel) = inner.upgrade() else {
        return false;
    };
    channel.detach().await;
    info!("Signaling channel closed: {}", address);
    true
}

#[async_trait]
impl SignalingOutput for SignalingChannel {
    async fn send(&self, message: Message) {
        SignalingChannel::send(self, message).await;
    }
}
