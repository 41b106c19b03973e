use crate::signaling::{SignalingTransport, TransportLink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Text-frame WebSocket link, one signaling message per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl SignalingTransport for WebSocketTransport {
    async fn open(&self, address: &str) -> Result<TransportLink> {
        let (ws_stream, _) = connect_async(address)
            .await
            .with_context(|| format!("WebSocket connect to {} failed", address))?;
        debug!("WebSocket connected: {}", address);

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

        let send_task = tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if ws_write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_write.close().await;
        });

        tokio::spawn(async move {
            while let Some(msg) = ws_read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if in_tx.send(text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket read error: {:?}", e);
                        break;
                    }
                }
            }
            // Stop accepting writes so that later sends get queued by the
            // channel instead of vanishing.
            send_task.abort();
        });

        Ok(TransportLink {
            sender: out_tx,
            receiver: in_rx,
        })
    }
}
