//! Data Transfer Objects (DTOs) for the relay server.
//!
//! - `http`: HTTP API response DTOs
//!
//! Frames on the WebSocket are opaque, so there are no WebSocket DTOs.

pub mod http;
