//! Connection adapter traits.
//!
//! The relay core talks to a peer only through these traits, so the WebSocket
//! adapter used in production and the in-memory adapter used in tests are
//! interchangeable.
//!
//! A connection is split into a [`FrameSource`] owned by the member's inbound
//! pump and a [`FrameSink`] owned by its outbound pump. Dropping both halves
//! closes the underlying connection.

use async_trait::async_trait;

use super::{ConnectionError, Frame};

/// A duplex connection that can be split into independent read and write halves.
pub trait Connection: Send + 'static {
    type Source: FrameSource;
    type Sink: FrameSink;

    fn split(self) -> (Self::Source, Self::Sink);
}

/// Read half of a connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Wait for the next inbound frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection cleanly.
    async fn receive_frame(&mut self) -> Result<Option<Frame>, ConnectionError>;
}

/// Write half of a connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one frame to the peer.
    async fn send_frame(&mut self, frame: Frame) -> Result<(), ConnectionError>;

    /// Send a close frame and shut the write half down.
    async fn close(&mut self) -> Result<(), ConnectionError>;
}
