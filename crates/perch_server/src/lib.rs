//! # Perch Sync Server
//!
//! Pull/push synchronization core for a public catalog of crawled
//! posts with per-user annotations.
//!
//! This crate provides:
//! - The catch-up cursor engine (record pull)
//! - The version-delta pull for annotations and mutation watermarks
//! - The mutation processor (push) with per-client deduplication
//! - Principal token authentication (HMAC-SHA256)
//!
//! # Architecture
//!
//! The server is a stateless request handler: each pull or push is one
//! request/response with no server-held session. Sync progress for the
//! record catalog lives entirely in the client-held cursor; the only
//! server-side per-client state is the mutation watermark, advanced by
//! compare-and-swap.
//!
//! # Protocol
//!
//! 1. Clients pull the record catalog with an opaque cursor. The server
//!    bootstraps new clients from the newest records, then streams
//!    newer content ahead of older backfill until both converge.
//! 2. Clients push annotation mutations in batches. Replays are
//!    silently skipped; deltas surface on the next annotation pull.
//! 3. Conflicts resolve last-write-wins at the server; mutations apply
//!    in submission order under a single authoritative version order.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod pull;
mod push;
mod server;

pub use auth::{AuthConfig, FeedSecret, PrincipalTokens};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::SyncServer;
