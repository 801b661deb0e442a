//! Per-user annotations on catalog records.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of mark a user can place on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    /// User saved the record.
    Bookmarked,
    /// User hid the record.
    Ignored,
    /// User flagged the record as removed upstream.
    Deleted,
}

impl MarkKind {
    /// Parses a mark name as submitted by clients.
    ///
    /// Clients historically sent both the short verb and the stored
    /// form, so both are accepted.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "bookmark" | "bookmarked" => Some(MarkKind::Bookmarked),
            "ignore" | "ignored" => Some(MarkKind::Ignored),
            "delete" | "deleted" => Some(MarkKind::Deleted),
            _ => None,
        }
    }
}

/// A user's mark on one record.
///
/// Keyed by (owner principal, record id) with upsert semantics. Like
/// records, annotations are tombstoned rather than removed so a sync
/// delta can carry the deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnnotation {
    /// Owning principal.
    pub owner_principal: String,
    /// Annotated record.
    pub record_id: String,
    /// Mark kind.
    pub kind: MarkKind,
    /// Creation time, Unix milliseconds.
    pub created_at: i64,
    /// Last update time, Unix milliseconds.
    pub updated_at: i64,
    /// Tombstone flag.
    #[serde(default)]
    pub deleted: bool,
    /// Version stamped by the mutation that last touched this row.
    #[serde(default)]
    pub last_modified_version: u64,
    /// Free-form user tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl UserAnnotation {
    /// Serializes the annotation as a patch value, excluding the key.
    pub fn patch_value(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.remove("recordId");
        }
        value
    }
}

/// In-memory annotation storage, keyed by (principal, record id).
///
/// The BTreeMap keeps per-principal scans in key order, which keeps
/// pull deltas deterministic.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    rows: RwLock<BTreeMap<(String, String), UserAnnotation>>,
}

impl AnnotationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates a mark, stamping it with `version`.
    pub fn upsert_mark(
        &self,
        principal: &str,
        record_id: &str,
        kind: MarkKind,
        tags: Vec<String>,
        version: u64,
        now: i64,
    ) {
        let key = (principal.to_string(), record_id.to_string());
        let mut rows = self.rows.write();
        match rows.get_mut(&key) {
            Some(row) => {
                row.kind = kind;
                row.tags = tags;
                row.deleted = false;
                row.updated_at = now;
                row.last_modified_version = version;
            }
            None => {
                rows.insert(
                    key,
                    UserAnnotation {
                        owner_principal: principal.to_string(),
                        record_id: record_id.to_string(),
                        kind,
                        created_at: now,
                        updated_at: now,
                        deleted: false,
                        last_modified_version: version,
                        tags,
                    },
                );
            }
        }
    }

    /// Tombstones a mark. Returns false if the mark never existed.
    pub fn tombstone(&self, principal: &str, record_id: &str, version: u64, now: i64) -> bool {
        let key = (principal.to_string(), record_id.to_string());
        let mut rows = self.rows.write();
        match rows.get_mut(&key) {
            Some(row) => {
                row.deleted = true;
                row.updated_at = now;
                row.last_modified_version = version;
                true
            }
            None => false,
        }
    }

    /// Returns one principal's annotation for a record.
    pub fn get(&self, principal: &str, record_id: &str) -> Option<UserAnnotation> {
        self.rows
            .read()
            .get(&(principal.to_string(), record_id.to_string()))
            .cloned()
    }

    /// Returns a principal's annotations modified after `version`, in
    /// record-id order.
    pub fn changed_since(&self, principal: &str, version: u64) -> Vec<UserAnnotation> {
        self.rows
            .read()
            .range((principal.to_string(), String::new())..)
            .take_while(|((owner, _), _)| owner == principal)
            .filter(|(_, row)| row.last_modified_version > version)
            .map(|(_, row)| row.clone())
            .collect()
    }

    /// Returns all annotations, for snapshotting.
    pub fn all(&self) -> Vec<UserAnnotation> {
        self.rows.read().values().cloned().collect()
    }

    /// Replaces the store contents, for snapshot restore.
    pub fn replace_all(&self, rows: Vec<UserAnnotation>) {
        let mut map = BTreeMap::new();
        for row in rows {
            map.insert((row.owner_principal.clone(), row.record_id.clone()), row);
        }
        *self.rows.write() = map;
    }

    /// Number of annotations, tombstones included.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the store holds no annotations.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}
