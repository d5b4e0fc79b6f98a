//! Bounded outbound queue of one member.
//!
//! The registry holds the only [`MailboxSender`]; the member's outbound pump
//! holds the [`MailboxReceiver`]. Dropping the sender is what closes the
//! mailbox, so ownership guarantees it is closed exactly once.
//!
//! Dropping the sender also fires the mailbox's [`Revocation`], which the
//! inbound pump watches to learn that the member was removed or evicted.

use std::num::NonZeroUsize;

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};

use crate::domain::Frame;

/// Outcome of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The frame was queued.
    Delivered,
    /// The mailbox is at capacity; the consumer is too slow.
    Full,
    /// The consumer has gone away.
    Closed,
}

/// Producer side of a mailbox.
#[derive(Debug)]
pub struct MailboxSender {
    sender: mpsc::Sender<Frame>,
    // Never written; dropping it is the revocation.
    _revoke: watch::Sender<()>,
}

/// Consumer side of a mailbox.
#[derive(Debug)]
pub struct MailboxReceiver {
    receiver: mpsc::Receiver<Frame>,
    revoked: watch::Receiver<()>,
}

/// Completes once the [`MailboxSender`] has been dropped.
///
/// Unlike the frame queue, it does not wait for pending frames to be drained,
/// and it stays completed.
#[derive(Debug, Clone)]
pub struct Revocation {
    revoked: watch::Receiver<()>,
}

/// Create a mailbox holding at most `capacity` pending frames.
pub fn mailbox(capacity: NonZeroUsize) -> (MailboxSender, MailboxReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.get());
    let (revoke, revoked) = watch::channel(());
    (
        MailboxSender {
            sender,
            _revoke: revoke,
        },
        MailboxReceiver { receiver, revoked },
    )
}

impl MailboxSender {
    /// Try to queue a frame without waiting.
    pub fn try_deliver(&self, frame: Frame) -> Delivery {
        match self.sender.try_send(frame) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl MailboxReceiver {
    /// Wait for the next frame.
    ///
    /// Frames queued before the mailbox was closed are still returned; `None`
    /// means the mailbox is closed and drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Take the next frame if one is already queued.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }

    /// Whether the producer side has been dropped.
    ///
    /// A closed mailbox may still hold frames queued before it was closed.
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }

    /// Signal that fires when the producer side is dropped.
    pub fn revocation(&self) -> Revocation {
        Revocation {
            revoked: self.revoked.clone(),
        }
    }

    /// Number of frames currently queued.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Revocation {
    /// Wait until the sender has been dropped. Cancel safe.
    pub async fn wait(&mut self) {
        // The value is never updated, so `changed` only returns once the
        // sender is gone.
        while self.revoked.changed().await.is_ok() {}
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.has_changed().is_err()
    }
}
