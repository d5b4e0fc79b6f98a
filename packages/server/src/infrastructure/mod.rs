//! Infrastructure layer
//!
//! - `connection`: adapters implementing the domain connection traits
//! - `dto`: response bodies of the HTTP API

pub mod connection;
pub mod dto;
