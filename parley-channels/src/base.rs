//! Base trait for realtime channels

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Trait for realtime channels
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Check if the transport is currently connected
    fn is_connected(&self) -> bool;

    /// Establish the connection
    async fn connect(&self) -> Result<()>;

    /// Register a listener for `event`
    ///
    /// Dropping the returned receiver unsubscribes; the connection itself
    /// is unaffected.
    fn subscribe(&self, event: &str) -> mpsc::UnboundedReceiver<Value>;

    /// Send `payload` as `event`
    async fn emit(&self, event: &str, payload: Value) -> Result<()>;

    /// Close the connection for every listener
    fn disconnect(&self);
}

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel not connected: {0}")]
    NotConnected(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Wire frame carrying one named event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Listener registry keyed by event name
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Arc<Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Value>>>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener for `event`
    pub fn add(&self, event: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .lock()
            .entry(event.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Deliver `payload` to every live listener of `event`
    ///
    /// Listeners whose receiver was dropped are pruned. Returns the number
    /// of listeners reached.
    pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let mut inner = self.inner.lock();
        let Some(listeners) = inner.get_mut(event) else {
            return 0;
        };
        listeners.retain(|tx| tx.send(payload.clone()).is_ok());
        let delivered = listeners.len();
        if listeners.is_empty() {
            inner.remove(event);
        }
        delivered
    }

    /// Number of registered listeners for `event`, including stale ones
    pub fn count(&self, event: &str) -> usize {
        self.inner.lock().get(event).map_or(0, Vec::len)
    }
}
