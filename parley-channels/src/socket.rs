//! WebSocket channel
//!
//! Each text frame is an [`Envelope`] (`{"event": ..., "data": ...}`).
//! After the first successful connect the background loop keeps the
//! connection alive, reconnecting after a fixed delay until
//! [`RealtimeChannel::disconnect`] is called.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parley_core::config::RealtimeConfig;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::base::{ChannelError, Envelope, RealtimeChannel, Result, Subscribers};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

// Type aliases for the WebSocket halves to simplify type signatures
type WsSink = futures::stream::SplitSink<WsStream, WsMessage>;
type WsSource = futures::stream::SplitStream<WsStream>;

/// Realtime channel over a WebSocket connection
pub struct SocketChannel {
    name: String,
    url: String,
    reconnect_delay: Duration,
    subscribers: Subscribers,
    /// WebSocket write half
    ws_tx: Arc<Mutex<Option<WsSink>>>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
    task_handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SocketChannel {
    pub fn new(config: &RealtimeConfig) -> Self {
        Self {
            name: "socket".to_string(),
            url: config.url.clone(),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            subscribers: Subscribers::new(),
            ws_tx: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            task_handle: parking_lot::Mutex::new(None),
        }
    }

    /// Get the endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    fn dispatch_frame(subscribers: &Subscribers, raw: &str) {
        let envelope: Envelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    "Invalid frame from server: {} (raw: {})",
                    e,
                    parley_core::utils::truncate(raw, 100)
                );
                return;
            }
        };

        let delivered = subscribers.dispatch(&envelope.event, &envelope.data);
        if delivered == 0 {
            debug!("No listeners for event: {}", envelope.event);
        }
    }

    /// WebSocket connection loop with reconnection
    async fn connection_loop(
        first: WsSource,
        url: String,
        reconnect_delay: Duration,
        subscribers: Subscribers,
        ws_tx: Arc<Mutex<Option<WsSink>>>,
        connected: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) {
        let mut pending = Some(first);

        'outer: loop {
            let mut read = match pending.take() {
                Some(read) => read,
                None => {
                    info!("Reconnecting in {:?}...", reconnect_delay);
                    tokio::select! {
                        _ = cancel.cancelled() => break 'outer,
                        _ = tokio::time::sleep(reconnect_delay) => {}
                    }
                    match connect_async(url.as_str()).await {
                        Ok((stream, _)) => {
                            info!("Reconnected to {}", url);
                            let (write, read) = stream.split();
                            *ws_tx.lock().await = Some(write);
                            connected.store(true, Ordering::SeqCst);
                            read
                        }
                        Err(e) => {
                            error!("Failed to reconnect to {}: {}", url, e);
                            continue;
                        }
                    }
                }
            };

            loop {
                tokio::select! {
                    msg = read.next() => {
                        match msg {
                            Some(Ok(WsMessage::Text(text))) => {
                                Self::dispatch_frame(&subscribers, &text);
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!("WebSocket closed by server");
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = cancel.cancelled() => {
                        debug!("Disconnect requested");
                        break;
                    }
                }
            }

            connected.store(false, Ordering::SeqCst);
            if let Some(mut write) = ws_tx.lock().await.take() {
                let _ = write.close().await;
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        info!("Socket connection loop ended");
    }
}

#[async_trait]
impl RealtimeChannel for SocketChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> Result<()> {
        if self.task_handle.lock().is_some() {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(ChannelError::ConnectionFailed(
                "channel was disconnected".to_string(),
            ));
        }

        info!("Connecting to {}...", self.url);
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::ConnectionFailed(format!("{}: {}", self.url, e)))?;
        info!("Connected to {}", self.url);

        let (write, read) = stream.split();
        *self.ws_tx.lock().await = Some(write);
        self.connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(Self::connection_loop(
            read,
            self.url.clone(),
            self.reconnect_delay,
            self.subscribers.clone(),
            self.ws_tx.clone(),
            self.connected.clone(),
            self.cancel.clone(),
        ));
        *self.task_handle.lock() = Some(handle);
        Ok(())
    }

    fn subscribe(&self, event: &str) -> mpsc::UnboundedReceiver<Value> {
        self.subscribers.add(event)
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<()> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected(self.url.clone()));
        }

        let frame = serde_json::to_string(&Envelope::new(event, payload))
            .map_err(|e| ChannelError::SendFailed(format!("Failed to serialize event: {}", e)))?;

        let mut tx = self.ws_tx.lock().await;
        match tx.as_mut() {
            Some(write) => write
                .send(WsMessage::Text(frame))
                .await
                .map_err(|e| ChannelError::SendFailed(format!("Failed to send: {}", e))),
            None => Err(ChannelError::NotConnected(self.url.clone())),
        }
    }

    fn disconnect(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!("Disconnecting from {}", self.url);
        self.cancel.cancel();
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
