//! PatternFly Documentation MCP Service
//!
//! This crate provides a Model Context Protocol (MCP) service that loads, searches and
//! caches PatternFly documentation. Documents can live under a local documentation root
//! or at remote URLs; every request is resolved inside a configured base directory,
//! loaded with bounded concurrency and joined into a single markdown response.
//!
//! # Features
//!
//! - Load local documentation and remote URLs in one call
//! - Fuzzy search over the documentation index
//! - Version-aware lookups from npm-style dependency ranges
//! - In-memory caching with sliding expiry and request coalescing
//! - stdio and SSE transports
//!
//! # Modules
//!
//! - [`matcher`]: name normalization and fuzzy matching
//! - [`version`]: dependency range to documentation version mapping
//! - [`resolver`]: identifier resolution with a base-directory jail
//! - [`memo`]: memoized async operations
//! - [`loader`]: single document loading, live or fixture-backed
//! - [`batch`]: concurrency-bounded batch loading
//! - [`aggregate`]: joining loaded documents into one response
//! - [`catalog`]: index of the documentation root
//! - [`mcp`]: MCP server implementation and protocol handling

pub mod aggregate;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod mcp;
pub mod memo;
pub mod resolver;
pub mod server;
pub mod version;
