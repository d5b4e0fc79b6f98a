//! Terminal client for the Hiroba relay.
//!
//! Reads lines from the terminal and sends each as one text frame; prints
//! every frame relayed from other clients.

pub mod error;
pub mod formatter;
pub mod runner;
pub mod session;
pub mod ui;

pub use error::ClientError;
pub use runner::run_client;
