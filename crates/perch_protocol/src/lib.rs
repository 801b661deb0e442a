//! # Perch Sync Protocol
//!
//! Wire types for synchronizing a crawled-post catalog with offline
//! clients.
//!
//! This crate provides:
//! - `Cursor` for client-held catch-up state
//! - `PatchOp` and `PatchBuilder` for delta transport
//! - Pull/push request and response messages
//!
//! This is a pure protocol crate with no I/O operations. All messages
//! are JSON on the wire; clients treat the cursor as opaque and the
//! server treats an incoming cursor as untrusted input.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cursor;
mod messages;
mod patch;

pub use cursor::{Cursor, CursorState};
pub use messages::{
    AnnotationPullRequest, Mutation, PullResponse, PushRequest, PushResponse, RecordPullRequest,
};
pub use patch::{PatchBuilder, PatchOp};
