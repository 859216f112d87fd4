//! Core types and storage for parley
//!
//! This crate provides the configuration, error, logging, message and
//! session types shared by all other parley components.

pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
