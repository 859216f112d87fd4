//! Session and chat-state persistence
//!
//! A [`SessionStore`] serializes values as JSON into a [`KeyValueStore`]
//! backend. Two well-known keys are derived from a shared prefix: one for
//! the session record and one for the persisted message sequence.

pub mod manager;
pub mod record;
pub mod store;

pub use manager::{SessionKeys, SessionStore};
pub use record::{SessionGuard, SessionRecord, SessionValidator, TokenPresent, UserProfile};
pub use store::{FileStore, KeyValueStore, MemoryStore};
