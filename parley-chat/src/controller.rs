//! Chat controller
//!
//! Lifecycle of a mounted chat view:
//!
//! 1. hydration: the persisted sequence is loaded once (absent means empty);
//! 2. live subscription: inbound events are validated and appended in
//!    arrival order;
//! 3. send: composed text is emitted and appended without waiting for the
//!    server.
//!
//! Every change to the sequence rewrites the whole sequence to the store
//! before the call returns, so storage never lags the view.

use parley_channels::{ChannelError, ChannelLease};
use parley_core::config::{ChatConfig, RealtimeConfig};
use parley_core::message::{ChatEvent, ChatMessage, Ownership, RejectReason, SenderId};
use parley_core::session::{SessionRecord, SessionStore};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Chat controller errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Chat view is not subscribed")]
    NotSubscribed,

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Storage(#[from] parley_core::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;

/// Tunables for a mounted view
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Event name carrying chat messages
    pub event: String,
    /// Retained messages; older ones are dropped first
    pub max_messages: usize,
    /// Drop inbound messages whose id is already present
    pub dedupe_echoes: bool,
}

impl ChatOptions {
    pub fn from_config(chat: &ChatConfig, realtime: &RealtimeConfig) -> Self {
        Self {
            event: realtime.event.clone(),
            max_messages: chat.max_messages,
            dedupe_echoes: chat.dedupe_echoes,
        }
    }
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default(), &RealtimeConfig::default())
    }
}

/// Outcome of handling one inbound payload
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Appended(ChatMessage),
    Duplicate(String),
    Rejected(RejectReason),
}

/// Notifications emitted by [`ChatController::run`]
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    Appended {
        message: ChatMessage,
        ownership: Ownership,
    },
    Rejected {
        reason: String,
    },
    SendFailed {
        reason: String,
    },
}

/// Controller for one mounted chat view
pub struct ChatController {
    store: SessionStore,
    lease: ChannelLease,
    user_id: SenderId,
    options: ChatOptions,
    messages: Vec<ChatMessage>,
    inbound: Option<mpsc::UnboundedReceiver<Value>>,
    rejected: usize,
}

impl ChatController {
    /// Hydrate from the store and subscribe to the chat event
    ///
    /// Requires an authenticated session so every sent message carries a
    /// sender.
    pub fn mount(
        store: SessionStore,
        lease: ChannelLease,
        session: &SessionRecord,
        options: ChatOptions,
    ) -> Result<Self> {
        let mut controller = Self {
            store,
            lease,
            user_id: session.user_id().clone(),
            options,
            messages: Vec::new(),
            inbound: None,
            rejected: 0,
        };

        controller.hydrate()?;
        controller.inbound = Some(controller.lease.subscribe(&controller.options.event));
        info!(
            user = %controller.user_id,
            history = controller.messages.len(),
            "Chat view mounted"
        );
        Ok(controller)
    }

    fn hydrate(&mut self) -> Result<()> {
        let mut messages = self.store.load_messages()?.unwrap_or_default();
        let overflow = messages.len().saturating_sub(self.options.max_messages);
        if overflow > 0 {
            messages.drain(..overflow);
        }
        self.messages = messages;
        self.persist()
    }

    /// Current sequence, in display order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Identity messages are sent as
    pub fn user_id(&self) -> &SenderId {
        &self.user_id
    }

    /// Number of inbound payloads refused so far
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Own/other attribution relative to the current user
    pub fn classify(&self, message: &ChatMessage) -> Ownership {
        message.ownership(Some(&self.user_id))
    }

    /// Messages paired with their attribution, computed on each call
    pub fn rendered(&self) -> impl Iterator<Item = (&ChatMessage, Ownership)> + '_ {
        self.messages.iter().map(move |m| (m, self.classify(m)))
    }

    /// Compose, emit and append a message
    ///
    /// The text is trimmed; blank text is refused. The append happens as
    /// soon as the frame is handed to the transport.
    pub async fn send(&mut self, text: &str) -> Result<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let message = ChatMessage::compose(text, self.user_id.clone());
        let payload = serde_json::to_value(&message).map_err(parley_core::Error::from)?;
        self.lease.emit(&self.options.event, payload).await?;
        debug!(message_id = %message.message_id, "Message sent");

        self.append(message.clone())?;
        Ok(message)
    }

    /// Validate and append one inbound payload
    pub fn receive(&mut self, payload: Value) -> Result<Received> {
        let message = match ChatEvent::from_payload(payload) {
            ChatEvent::Message(message) => message,
            ChatEvent::Rejected { reason, raw } => {
                self.rejected += 1;
                warn!(
                    "Dropping malformed chat payload ({}): {}",
                    reason,
                    parley_core::utils::truncate(&raw.to_string(), 100)
                );
                return Ok(Received::Rejected(reason));
            }
        };

        if self.options.dedupe_echoes && self.contains(&message.message_id) {
            debug!(message_id = %message.message_id, "Skipping duplicate message");
            return Ok(Received::Duplicate(message.message_id));
        }

        self.append(message.clone())?;
        Ok(Received::Appended(message))
    }

    /// Wait for the next inbound payload
    pub async fn next_inbound(&mut self) -> Option<Value> {
        self.inbound.as_mut()?.recv().await
    }

    /// Drive the view until `outgoing` closes or the subscription ends
    ///
    /// Texts read from `outgoing` are sent; every change is reported on
    /// `updates`. Storage failures stop the loop.
    pub async fn run(
        &mut self,
        mut outgoing: mpsc::Receiver<String>,
        updates: mpsc::UnboundedSender<ChatUpdate>,
    ) -> Result<()> {
        let mut inbound = self.inbound.take().ok_or(ChatError::NotSubscribed)?;

        let result = loop {
            tokio::select! {
                payload = inbound.recv() => {
                    let Some(payload) = payload else {
                        info!("Inbound stream closed");
                        break Ok(());
                    };
                    match self.receive(payload) {
                        Ok(Received::Appended(message)) => {
                            let ownership = self.classify(&message);
                            let _ = updates.send(ChatUpdate::Appended { message, ownership });
                        }
                        Ok(Received::Duplicate(_)) => {}
                        Ok(Received::Rejected(reason)) => {
                            let _ = updates.send(ChatUpdate::Rejected {
                                reason: reason.to_string(),
                            });
                        }
                        Err(e) => break Err(e),
                    }
                }
                text = outgoing.recv() => {
                    let Some(text) = text else {
                        break Ok(());
                    };
                    match self.send(&text).await {
                        Ok(message) => {
                            let _ = updates.send(ChatUpdate::Appended {
                                message,
                                ownership: Ownership::Own,
                            });
                        }
                        Err(ChatError::EmptyMessage) => {}
                        Err(ChatError::Channel(e)) => {
                            warn!("Failed to send message: {}", e);
                            let _ = updates.send(ChatUpdate::SendFailed {
                                reason: e.to_string(),
                            });
                        }
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        self.inbound = Some(inbound);
        result
    }

    /// Tear down the subscription and give up this view's channel lease
    ///
    /// Returns true when this was the last owner and the connection closed.
    pub fn unmount(mut self) -> bool {
        self.inbound = None;
        info!(user = %self.user_id, "Chat view unmounted");
        self.lease.release()
    }

    fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.message_id == message_id)
    }

    fn append(&mut self, message: ChatMessage) -> Result<()> {
        self.messages.push(message);
        let overflow = self.messages.len().saturating_sub(self.options.max_messages);
        if overflow > 0 {
            self.messages.drain(..overflow);
        }
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        self.store.save_messages(&self.messages)?;
        Ok(())
    }
}
