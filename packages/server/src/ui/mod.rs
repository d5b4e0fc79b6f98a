//! HTTP / WebSocket surface of the relay server.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
