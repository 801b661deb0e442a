//! # Perch Store
//!
//! Data model and storage adapters for the Perch sync server.
//!
//! This crate provides:
//! - `Record` and `UserAnnotation` entity types
//! - The `RecordStore` adapter trait with an in-memory implementation
//! - The `ClientRegistry` for mutation watermarks and group versions
//! - The `VersionAuthority` that stamps committed mutations
//! - JSON snapshot persistence for operator tooling
//!
//! Records enter through the ingestion feed (the upstream crawler) and
//! are never physically deleted, only tombstoned with a bumped version.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod annotation;
mod error;
mod record;
mod registry;
mod snapshot;
mod store;
mod version;

pub use annotation::{AnnotationStore, MarkKind, UserAnnotation};
pub use error::{StoreError, StoreResult};
pub use record::{Record, ASSET_SLOTS};
pub use registry::{Client, ClientGroup, ClientRegistry};
pub use snapshot::Snapshot;
pub use store::{MemoryRecordStore, RecordStore};
pub use version::VersionAuthority;
