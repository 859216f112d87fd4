//! Shared ownership of a realtime connection

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::base::RealtimeChannel;

struct Shared {
    channel: Arc<dyn RealtimeChannel>,
    owners: AtomicUsize,
}

/// One owner's handle on a shared channel
///
/// Cloning registers another owner. Releasing or dropping a lease removes
/// its owner; the connection is closed when the last owner goes away, so
/// one view unmounting never cuts off another.
pub struct ChannelLease {
    shared: Arc<Shared>,
    released: bool,
}

impl ChannelLease {
    /// Take the first lease on `channel`
    pub fn new(channel: Arc<dyn RealtimeChannel>) -> Self {
        Self {
            shared: Arc::new(Shared {
                channel,
                owners: AtomicUsize::new(1),
            }),
            released: false,
        }
    }

    /// The shared channel
    pub fn channel(&self) -> &Arc<dyn RealtimeChannel> {
        &self.shared.channel
    }

    /// Current number of owners
    pub fn owners(&self) -> usize {
        self.shared.owners.load(Ordering::SeqCst)
    }

    /// Give up this lease; returns true if it was the last one and the
    /// connection was closed
    pub fn release(mut self) -> bool {
        self.released = true;
        self.release_owner()
    }

    fn release_owner(&self) -> bool {
        let previous = self.shared.owners.fetch_sub(1, Ordering::AcqRel);
        if previous == 1 {
            info!(
                "Last owner released {} channel, disconnecting",
                self.shared.channel.name()
            );
            self.shared.channel.disconnect();
            true
        } else {
            debug!("Channel lease released, {} owner(s) remain", previous - 1);
            false
        }
    }
}

impl Clone for ChannelLease {
    fn clone(&self) -> Self {
        self.shared.owners.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: self.shared.clone(),
            released: false,
        }
    }
}

impl Drop for ChannelLease {
    fn drop(&mut self) {
        if !self.released {
            self.release_owner();
        }
    }
}

impl Deref for ChannelLease {
    type Target = dyn RealtimeChannel;

    fn deref(&self) -> &Self::Target {
        self.shared.channel.as_ref()
    }
}
