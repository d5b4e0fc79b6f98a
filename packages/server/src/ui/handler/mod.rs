//! Request handlers.

mod http;
mod websocket;

pub use http::{get_members, health_check};
pub use websocket::websocket_handler;
