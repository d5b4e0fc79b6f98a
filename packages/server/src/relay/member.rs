//! Member pumps
//!
//! Every admitted member runs two tasks:
//!
//! - the inbound pump reads frames from the connection and hands each one to
//!   the registry for broadcast, excluding the member itself
//! - the outbound pump drains the member's mailbox into the connection
//!
//! Whichever side fails first starts the teardown. The inbound pump always
//! finishes by removing the member from the registry, which closes the
//! mailbox and lets the outbound pump send a close frame and exit. When the
//! outbound pump exits first it drops `writer_done`, which wakes the inbound
//! pump.
//!
//! When the registry drops the member on its own (eviction), the mailbox's
//! revocation wakes the inbound pump. It stops relaying at once and aborts the
//! outbound pump, which may be stuck writing to a peer that stopped reading;
//! dropping both halves closes the connection.

use tokio::{
    sync::oneshot,
    task::{AbortHandle, JoinHandle},
};

use crate::domain::{Connection, FrameSink, FrameSource, MemberId};

use super::{
    mailbox::{MailboxReceiver, Revocation},
    registry::RegistryHandle,
};

/// Handle to the two pumps of an accepted member.
///
/// Dropping the handle detaches the pumps; they keep running until the
/// connection ends.
#[derive(Debug)]
pub struct MemberHandle {
    id: MemberId,
    inbound: JoinHandle<InboundExit>,
    outbound: JoinHandle<OutboundExit>,
}

impl MemberHandle {
    pub fn id(&self) -> MemberId {
        self.id
    }

    /// Wait until both pumps have exited.
    pub async fn closed(self) {
        match self.inbound.await {
            Ok(exit) => tracing::debug!("Inbound pump of '{}' exited: {:?}", self.id, exit),
            Err(e) => tracing::warn!("Inbound pump of '{}' failed: {}", self.id, e),
        }
        match self.outbound.await {
            Ok(exit) => tracing::debug!("Outbound pump of '{}' exited: {:?}", self.id, exit),
            Err(e) if e.is_cancelled() => {
                tracing::debug!("Outbound pump of '{}' was aborted", self.id)
            }
            Err(e) => tracing::warn!("Outbound pump of '{}' failed: {}", self.id, e),
        }
    }
}

/// Start the inbound and outbound pumps of an admitted member.
pub(crate) fn spawn_member<C: Connection>(
    id: MemberId,
    connection: C,
    mailbox: MailboxReceiver,
    registry: RegistryHandle,
) -> MemberHandle {
    let (source, sink) = connection.split();
    let (writer_done_tx, writer_done_rx) = oneshot::channel();
    let revocation = mailbox.revocation();

    let outbound = tokio::spawn(outbound_pump(id, mailbox, sink, writer_done_tx));
    let teardown = Teardown {
        revocation,
        writer_done: writer_done_rx,
        outbound: outbound.abort_handle(),
    };
    let inbound = tokio::spawn(inbound_pump(id, source, registry, teardown));

    MemberHandle {
        id,
        inbound,
        outbound,
    }
}

/// What the inbound pump watches besides the connection.
struct Teardown {
    /// Fires when the registry has dropped the member's mailbox
    revocation: Revocation,
    /// Fires when the outbound pump has exited
    writer_done: oneshot::Receiver<()>,
    outbound: AbortHandle,
}

/// Why the inbound loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InboundExit {
    PeerClosed,
    ReadFailed,
    WriterGone,
    /// Evicted, or otherwise dropped by the registry
    Unregistered,
    RegistryStopped,
}

async fn inbound_pump<S: FrameSource>(
    id: MemberId,
    mut source: S,
    registry: RegistryHandle,
    mut teardown: Teardown,
) -> InboundExit {
    let exit = loop {
        tokio::select! {
            // Checked first so a revoked member never relays another frame
            biased;
            _ = teardown.revocation.wait() => break InboundExit::Unregistered,
            _ = &mut teardown.writer_done => break InboundExit::WriterGone,
            received = source.receive_frame() => match received {
                Ok(Some(frame)) => {
                    tracing::debug!("Received {} byte(s) from '{}'", frame.len(), id);
                    if registry.broadcast(frame, Some(id)).await.is_err() {
                        break InboundExit::RegistryStopped;
                    }
                }
                Ok(None) => {
                    tracing::info!("Member '{}' closed the connection", id);
                    break InboundExit::PeerClosed;
                }
                Err(e) if e.is_expected_closure() => {
                    tracing::debug!("Member '{}' went away: {}", id, e);
                    break InboundExit::PeerClosed;
                }
                Err(e) => {
                    tracing::warn!("Unexpected read error from '{}': {}", id, e);
                    break InboundExit::ReadFailed;
                }
            },
        }
    };

    if exit == InboundExit::Unregistered {
        // The mailbox is gone; nothing left for the writer to deliver.
        tracing::debug!("Member '{}' was unregistered, stopping its writer", id);
        teardown.outbound.abort();
    }

    match registry.remove(id).await {
        Ok(true) => tracing::debug!("Member '{}' unregistered ({:?})", id, exit),
        Ok(false) => tracing::debug!("Member '{}' was already unregistered ({:?})", id, exit),
        Err(e) => tracing::warn!("Failed to unregister '{}': {}", id, e),
    }

    // Dropping the read half closes the connection once the outbound pump
    // has released the write half.
    drop(source);
    exit
}

/// Why the outbound loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutboundExit {
    MailboxClosed,
    WriteFailed,
}

async fn outbound_pump<K: FrameSink>(
    id: MemberId,
    mut mailbox: MailboxReceiver,
    mut sink: K,
    writer_done: oneshot::Sender<()>,
) -> OutboundExit {
    let mut exit = OutboundExit::MailboxClosed;

    while let Some(frame) = mailbox.recv().await {
        if let Err(e) = sink.send_frame(frame).await {
            if e.is_expected_closure() {
                tracing::debug!("Stopped writing to '{}': {}", id, e);
            } else {
                tracing::warn!("Failed to write message to '{}': {}", id, e);
            }
            exit = OutboundExit::WriteFailed;
            break;
        }
    }

    if exit == OutboundExit::MailboxClosed {
        tracing::debug!("Mailbox of '{}' closed, sending close frame", id);
    }
    if let Err(e) = sink.close().await {
        tracing::debug!("Failed to close connection of '{}': {}", id, e);
    }

    drop(writer_done);
    exit
}
