//! Relay tunables.

use std::num::NonZeroUsize;

/// Default number of frames a member may have queued before it is evicted.
pub const DEFAULT_MAILBOX_CAPACITY: NonZeroUsize = NonZeroUsize::new(256).unwrap();

/// Default depth of the registry command queue.
pub const DEFAULT_COMMAND_BUFFER: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

/// Configuration of the relay core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Capacity of each member's outbound mailbox
    pub mailbox_capacity: NonZeroUsize,
    /// Capacity of the queue feeding the registry event loop
    pub command_buffer: NonZeroUsize,
}

impl RelayConfig {
    pub fn new(mailbox_capacity: NonZeroUsize, command_buffer: NonZeroUsize) -> Self {
        Self {
            mailbox_capacity,
            command_buffer,
        }
    }

    /// Same configuration with a different mailbox capacity.
    pub fn with_mailbox_capacity(self, mailbox_capacity: NonZeroUsize) -> Self {
        Self {
            mailbox_capacity,
            ..self
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY, DEFAULT_COMMAND_BUFFER)
    }
}
