//! Network client for the BlogSphere offline worker.
//!
//! This crate provides the HTTP transport used on cache misses and during
//! install, plus URL helpers for origins and request targets.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, origin_root, parse_origin, resolve, same_origin};
