//! In-process channel
//!
//! Delivers events between listeners of the same process without a network.
//! With echo enabled every emitted event is also delivered back to local
//! listeners, mirroring a broadcast server that includes the sender.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use crate::base::{ChannelError, Envelope, RealtimeChannel, Result, Subscribers};

pub struct LoopbackChannel {
    echo: bool,
    subscribers: Subscribers,
    connected: AtomicBool,
    sent: Mutex<Vec<Envelope>>,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self {
            echo: false,
            subscribers: Subscribers::new(),
            connected: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Deliver emitted events back to local listeners as well
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Deliver `payload` to listeners as if it arrived from the remote side
    pub fn inject(&self, event: &str, payload: Value) -> usize {
        self.subscribers.dispatch(event, &payload)
    }

    /// Events emitted so far, oldest first
    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeChannel for LoopbackChannel {
    fn name(&self) -> &str {
        "loopback"
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self, event: &str) -> mpsc::UnboundedReceiver<Value> {
        self.subscribers.add(event)
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<()> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected("loopback".to_string()));
        }
        debug!("Loopback emit: {}", event);
        self.sent.lock().push(Envelope::new(event, payload.clone()));
        if self.echo {
            self.subscribers.dispatch(event, &payload);
        }
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}
