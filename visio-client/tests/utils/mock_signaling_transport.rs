use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;
use visio_client::{SignalingTransport, TransportLink};
use visio_core::Message;

/// Server end of a link opened through [`MockSignalingTransport`].
///
/// Dropping it closes the link for the client.
pub struct ServerLink {
    pub to_client: mpsc::UnboundedSender<String>,
    pub from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerLink {
    pub fn send(&self, message: Message) {
        let _ = self.to_client.send(message.serialize());
    }

    /// Sends raw wire text.
    pub fn send_raw(&self, frame: &str) {
        let _ = self.to_client.send(frame.to_owned());
    }

    pub async fn recv(&mut self) -> Option<Message> {
        let frame = self.from_client.recv().await?;
        Some(Message::deserialize(&frame))
    }
}

/// In-memory signaling server. Every successful `open` yields a
/// [`ServerLink`] on the receiver returned by [`MockSignalingTransport::new`].
pub struct MockSignalingTransport {
    links_tx: mpsc::UnboundedSender<ServerLink>,
    refuse: AtomicBool,
    attempts: Mutex<Vec<Instant>>,
}

impl MockSignalingTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerLink>) {
        let (links_tx, links_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            links_tx,
            refuse: AtomicBool::new(false),
            attempts: Mutex::new(Vec::new()),
        });
        (transport, links_rx)
    }

    /// While set, every `open` fails.
    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Times of every `open` call, successful or not.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalingTransport for MockSignalingTransport {
    async fn open(&self, address: &str) -> Result<TransportLink> {
        self.attempts.lock().unwrap().push(Instant::now());

        if self.refuse.load(Ordering::SeqCst) {
            bail!("connection to {} refused", address);
        }

        let (to_client, client_rx) = mpsc::unbounded_channel();
        let (client_tx, from_client) = mpsc::unbounded_channel();
        let _ = self.links_tx.send(ServerLink {
            to_client,
            from_client,
        });

        Ok(TransportLink {
            sender: client_tx,
            receiver: client_rx,
        })
    }
}
