//! Message and event types for the chat stream

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identity of a message sender, as returned by the auth gateway
///
/// The gateway may hand out numeric or string ids; comparison is strict, so
/// `7` and `"7"` are different senders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SenderId {
    Number(i64),
    Text(String),
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderId::Number(n) => write!(f, "{}", n),
            SenderId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for SenderId {
    fn from(id: i64) -> Self {
        SenderId::Number(id)
    }
}

impl From<&str> for SenderId {
    fn from(id: &str) -> Self {
        SenderId::Text(id.to_string())
    }
}

impl From<String> for SenderId {
    fn from(id: String) -> Self {
        SenderId::Text(id)
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message text
    pub message: String,
    /// Caller-generated unique id
    pub message_id: String,
    /// Sender identity; missing on payloads from anonymous senders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<SenderId>,
}

impl ChatMessage {
    /// Compose a new outgoing message with a fresh id
    pub fn compose(text: impl Into<String>, sender_id: SenderId) -> Self {
        Self {
            message: text.into(),
            message_id: uuid::Uuid::new_v4().to_string(),
            sender_id: Some(sender_id),
        }
    }

    /// Classify this message relative to the current user
    pub fn ownership(&self, current_user: Option<&SenderId>) -> Ownership {
        match (self.sender_id.as_ref(), current_user) {
            (Some(sender), Some(user)) if sender == user => Ownership::Own,
            _ => Ownership::Other,
        }
    }
}

/// Which side of the conversation a message is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Own,
    Other,
}

/// Why an inbound payload was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("payload is not a JSON object")]
    NotAnObject,
    #[error("field `{0}` is missing or has the wrong type")]
    InvalidField(&'static str),
    #[error("field `message_id` is empty")]
    EmptyId,
}

/// A validated inbound chat event
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A well-formed message
    Message(ChatMessage),
    /// A payload that failed validation, kept for diagnostics
    Rejected { reason: RejectReason, raw: Value },
}

impl ChatEvent {
    /// Parse and validate a raw channel payload
    pub fn from_payload(raw: Value) -> Self {
        match validate(&raw) {
            Ok(message) => ChatEvent::Message(message),
            Err(reason) => ChatEvent::Rejected { reason, raw },
        }
    }
}

fn validate(raw: &Value) -> Result<ChatMessage, RejectReason> {
    let obj = raw.as_object().ok_or(RejectReason::NotAnObject)?;

    let message = obj
        .get("message")
        .and_then(Value::as_str)
        .ok_or(RejectReason::InvalidField("message"))?;
    let message_id = obj
        .get("message_id")
        .and_then(Value::as_str)
        .ok_or(RejectReason::InvalidField("message_id"))?;
    if message_id.trim().is_empty() {
        return Err(RejectReason::EmptyId);
    }

    let sender_id = match obj.get("sender_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(SenderId::Text(s.clone())),
        Some(Value::Number(n)) => Some(SenderId::Number(
            n.as_i64().ok_or(RejectReason::InvalidField("sender_id"))?,
        )),
        Some(_) => return Err(RejectReason::InvalidField("sender_id")),
    };

    Ok(ChatMessage {
        message: message.to_string(),
        message_id: message_id.to_string(),
        sender_id,
    })
}
