//! SQLite-backed store of named, versioned cache partitions.
//!
//! This module provides a durable mapping from request identity to captured
//! response, grouped into partitions, using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Partitions created on first open and deleted wholesale
//! - Last-write-wins upserts keyed by a SHA-256 of method and URL
//! - Cross-partition lookup in partition creation order
//! - The activated version per origin, so control survives a restart
//! - WAL mode so several worker instances can share one store

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod partitions;
pub mod registrations;
pub mod request;
pub mod response;

pub use crate::Error;

pub use connection::CacheDb;
pub use partitions::Partition;
pub use request::{Destination, Request, RequestIdentity};
pub use response::{CacheableResponse, CapturedResponse, ResponseType};
