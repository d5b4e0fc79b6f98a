//! Broadcast relay core.
//!
//! - [`registry`]: the serialized authority owning the membership set
//! - [`mailbox`]: bounded per-member outbound queue
//! - [`member`]: inbound and outbound pumps of one connection
//! - [`service`]: the `Relay` entry point that wires them together

pub mod config;
pub mod mailbox;
pub mod member;
pub mod registry;
pub mod service;

pub use config::RelayConfig;
pub use mailbox::{Delivery, MailboxReceiver, MailboxSender, Revocation, mailbox};
pub use member::MemberHandle;
pub use registry::{MemberSummary, Registry, RegistryHandle, RegistrySnapshot, RegistryStats};
pub use service::Relay;
