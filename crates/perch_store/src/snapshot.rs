//! JSON snapshot persistence for operator tooling.

use crate::annotation::{AnnotationStore, UserAnnotation};
use crate::error::StoreResult;
use crate::record::Record;
use crate::store::MemoryRecordStore;
use crate::version::VersionAuthority;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A serializable capture of the in-memory stores.
///
/// Used by the CLI to import crawled feeds, inspect the catalog, and
/// replay client bootstraps offline. Not a replication format.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// All catalog records in id order.
    pub records: Vec<Record>,
    /// All annotations, tombstones included.
    #[serde(default)]
    pub annotations: Vec<UserAnnotation>,
    /// Last issued version.
    #[serde(default)]
    pub version: u64,
}

impl Snapshot {
    /// Captures the current state of the given stores.
    pub fn capture(
        records: &MemoryRecordStore,
        annotations: &AnnotationStore,
        versions: &VersionAuthority,
    ) -> Self {
        Self {
            records: records.all(),
            annotations: annotations.all(),
            version: versions.current(),
        }
    }

    /// Reads a snapshot from disk.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Writes the snapshot to disk atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Rebuilds in-memory stores from the snapshot.
    pub fn restore(self) -> (MemoryRecordStore, AnnotationStore, VersionAuthority) {
        let records = MemoryRecordStore::from_records(self.records);
        let annotations = AnnotationStore::new();
        annotations.replace_all(self.annotations);
        let versions = VersionAuthority::resume_at(self.version);
        (records, annotations, versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::MarkKind;
    use crate::store::RecordStore;

    fn record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            owner_handle: "h".to_string(),
            created_at: 1,
            body: "b".to_string(),
            asset_mask: 1,
            deleted: false,
            last_modified_version: 0,
        }
    }

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let records = MemoryRecordStore::from_records(vec![record("a"), record("b")]);
        let annotations = AnnotationStore::new();
        let versions = VersionAuthority::new();
        annotations.upsert_mark("u1", "a", MarkKind::Bookmarked, vec![], versions.next(), 100);

        Snapshot::capture(&records, &annotations, &versions)
            .save(&path)
            .unwrap();

        let (records, annotations, versions) = Snapshot::load(&path).unwrap().restore();
        assert_eq!(records.len(), 2);
        assert_eq!(annotations.len(), 1);
        assert_eq!(versions.current(), 1);
        assert_eq!(versions.next(), 2);
        assert!(records.get("a").unwrap().is_some());
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").unwrap();

        assert!(Snapshot::load(&path).is_err());
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let first = Snapshot {
            records: vec![record("a")],
            ..Snapshot::default()
        };
        first.save(&path).unwrap();

        let second = Snapshot {
            records: vec![record("a"), record("b")],
            ..Snapshot::default()
        };
        second.save(&path).unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert!(!path.with_extension("tmp").exists());
    }
}
