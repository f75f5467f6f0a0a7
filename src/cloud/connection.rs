// src/cloud/connection.rs - One websocket connection attempt to the server
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

/// Writer-side channel depth. Frames past this while the sink is backed up
/// are dropped, same as frames sent while disconnected.
const SEND_BUFFER_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("websocket not open after {0:?}")]
    ConnectTimeout(Duration),
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// Callbacks for connection lifecycle and inbound traffic. Implementations
/// of `on_message` may block on I/O; frames are dispatched on their own task
/// so the read path keeps draining.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn on_open(&self) {}

    async fn on_close(&self) {}

    async fn on_message(&self, raw: String);

    async fn on_error(&self, error: &tungstenite::Error) {
        tracing::warn!("websocket error: {error}");
    }
}

/// Handle to one live websocket connection.
///
/// Opening either observes the Open state within the timeout or fails with
/// the socket released. After open, a writer task owns the sink and a reader
/// task owns the stream; this handle only flips state and feeds the writer.
#[derive(Debug)]
pub struct Connection {
    state: Arc<Mutex<SocketState>>,
    outgoing: mpsc::Sender<Message>,
}

impl Connection {
    pub async fn open(
        url: &str,
        handler: Arc<dyn ConnectionHandler>,
        timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let state = Arc::new(Mutex::new(SocketState::Connecting));
        let (stream, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| ConnectionError::ConnectTimeout(timeout))??;
        *state.lock().unwrap_or_else(PoisonError::into_inner) = SocketState::Open;
        let (outgoing, mut outgoing_rx) = mpsc::channel::<Message>(SEND_BUFFER_SIZE);
        let (mut sink, mut source) = stream.split();

        handler.on_open().await;

        // Writer: drains the channel into the sink until a close frame goes
        // out or the peer is gone.
        tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if sink.send(message).await.is_err() {
                    break;
                }
                if closing {
                    let _ = sink.flush().await;
                    break;
                }
            }
        });

        // Reader: delivers frames until error or close. Each text frame is
        // handled on its own task; command handling can fetch files and must
        // not stall the read path.
        let reader_state = state.clone();
        let reader_outgoing = outgoing.clone();
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            handler.on_message(text.to_string()).await;
                        });
                    }
                    Ok(Message::Ping(payload)) => {
                        let _ = reader_outgoing.try_send(Message::Pong(payload));
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        handler.on_error(&e).await;
                        break;
                    }
                }
            }
            // Half-open states are not allowed: any reader exit tears the
            // connection down.
            *reader_state.lock().unwrap_or_else(PoisonError::into_inner) =
                SocketState::Disconnected;
            let _ = reader_outgoing.try_send(Message::Close(None));
            handler.on_close().await;
        });

        Ok(Self { state, outgoing })
    }

    /// Queues a text frame for transmission. A no-op (logged, not an error)
    /// when the connection is not open.
    pub fn send(&self, raw: String) {
        if !self.is_connected() {
            tracing::debug!("websocket not open, dropping outbound frame");
            return;
        }
        if let Err(e) = self.outgoing.try_send(Message::Text(raw.into())) {
            tracing::warn!("outbound frame dropped: {e}");
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) == SocketState::Open
    }

    pub fn state(&self) -> SocketState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a graceful shutdown. Idempotent.
    pub fn close(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if matches!(*state, SocketState::Closing | SocketState::Disconnected) {
                return;
            }
            *state = SocketState::Closing;
        }
        if let Err(e) = self.outgoing.try_send(Message::Close(None)) {
            // The peer will still see the connection drop once the tasks go;
            // the lost frame only costs a graceful close code.
            tracing::warn!("close frame not queued: {e}");
        }
    }
}
