//! Domain layer
//!
//! Core value types shared by the relay and its connection adapters.
//! Nothing in this module depends on a concrete transport.

pub mod connection;
pub mod error;
pub mod frame;
pub mod member;

pub use connection::{Connection, FrameSink, FrameSource};
#[cfg(test)]
pub use connection::{MockFrameSink, MockFrameSource};
pub use error::{ConnectionError, RegistryError};
pub use frame::Frame;
pub use member::MemberId;
