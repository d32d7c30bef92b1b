//! Storage node implementation
//!
//! A storage node owns one document collection and serves it over HTTP:
//! - File-backed collection with an append-only, CRC-checked log
//! - In-memory collection when no data directory is configured

pub mod collection;
pub mod http;
pub mod log;
pub mod server;

pub use collection::FileCollection;
pub use server::{serve_on, NodeServer};
