//! Chat message types
//!
//! Messages are exchanged with the realtime channel as plain JSON objects
//! and persisted as an ordered sequence. Inbound payloads are validated at
//! the boundary through [`ChatEvent::from_payload`].

pub mod events;

pub use events::{ChatEvent, ChatMessage, Ownership, RejectReason, SenderId};
