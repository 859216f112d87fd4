//! Realtime channel transports for parley
//!
//! A channel carries named JSON events in both directions. The chat view
//! consumes a channel through a [`ChannelLease`], which shares one
//! connection between owners and closes it when the last owner lets go.

pub mod base;
pub mod lease;
pub mod loopback;
pub mod socket;

pub use base::{ChannelError, Envelope, RealtimeChannel, Result, Subscribers};
pub use lease::ChannelLease;
pub use loopback::LoopbackChannel;
pub use socket::SocketChannel;
