//! Domain error types.

use thiserror::Error;

use super::MemberId;

/// Errors raised by a connection adapter.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The peer went away (going-away close, abnormal closure, reset).
    #[error("Peer went away: {0}")]
    PeerGone(String),

    /// The peer closed the connection with an unexpected close code.
    #[error("Connection closed with code {code}: {reason}")]
    UnexpectedClose { code: u16, reason: String },

    /// Any other transport failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ConnectionError {
    /// Whether this error is an ordinary end of a connection.
    ///
    /// Only used to pick the log level; every variant tears the member down
    /// the same way.
    pub fn is_expected_closure(&self) -> bool {
        matches!(self, Self::PeerGone(_))
    }
}

/// Errors returned by the registry handle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry event loop has stopped.
    #[error("Registry is no longer running")]
    Stopped,

    /// A member with the same id is already in the set.
    #[error("Member '{0}' is already admitted")]
    AlreadyAdmitted(MemberId),
}
