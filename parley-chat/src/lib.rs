//! Chat view controller for parley
//!
//! Owns the in-memory message sequence of one mounted chat view and keeps
//! it written through to the session store.

pub mod controller;

pub use controller::{ChatController, ChatError, ChatOptions, ChatUpdate, Received, Result};
