//! services/api/src/lib.rs
//!
//! The service side of the console: configuration, store adapters and the
//! HTTP/WebSocket surface. The binaries in `src/bin` only wire these together.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
