//! Core types and shared functionality for the BlogSphere offline worker.
//!
//! This crate provides:
//! - Versioned, partitioned response cache with SQLite backend
//! - Request and captured-response types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    CacheDb, CacheableResponse, CapturedResponse, Destination, Partition, Request, RequestIdentity, ResponseType,
};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
