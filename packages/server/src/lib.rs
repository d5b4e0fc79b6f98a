//! Hiroba broadcast relay server.
//!
//! - [`domain`]: frames, member ids, connection traits and errors
//! - [`relay`]: registry, mailboxes and member pumps
//! - [`infrastructure`]: WebSocket and in-memory connection adapters, DTOs
//! - [`ui`]: axum router, handlers and the server entry point

pub mod domain;
pub mod infrastructure;
pub mod relay;
pub mod ui;
