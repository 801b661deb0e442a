//! Record store adapter.

use crate::error::StoreResult;
use crate::record::Record;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Read and ingestion access to catalog records, ordered by id.
///
/// The sync core consumes this as a capability: "read records filtered
/// and ordered by key, with pagination." All range queries rely on a
/// stable total order over `id`. Every fetch is bounded by an explicit
/// limit.
pub trait RecordStore: Send + Sync {
    /// Records with `id > after`, ascending, at most `limit`.
    fn range_newer_than(&self, after: &str, limit: usize) -> StoreResult<Vec<Record>>;

    /// Records with `id < before`, descending, at most `limit`.
    fn range_older_than(&self, before: &str, limit: usize) -> StoreResult<Vec<Record>>;

    /// The newest `limit` records, descending.
    fn newest(&self, limit: usize) -> StoreResult<Vec<Record>>;

    /// The single newest record, if any.
    fn newest_single(&self) -> StoreResult<Option<Record>>;

    /// Looks up one record by id.
    fn get(&self, id: &str) -> StoreResult<Option<Record>>;

    /// Inserts or fully replaces a record by id (the ingestion feed).
    fn upsert(&self, record: Record) -> StoreResult<()>;

    /// Marks a record deleted and stamps it with `version`. Returns
    /// false if the record does not exist.
    fn tombstone(&self, id: &str, version: u64) -> StoreResult<bool>;

    /// Number of records, tombstones included.
    fn len(&self) -> usize;

    /// Returns true if the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory record store over a BTreeMap.
///
/// The map's key order is the catalog's id order, so range queries are
/// ordinary map ranges.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, Record>>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let map = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: RwLock::new(map),
        }
    }

    /// Returns all records in id order, for snapshotting.
    pub fn all(&self) -> Vec<Record> {
        self.records.read().values().cloned().collect()
    }
}

impl RecordStore for MemoryRecordStore {
    fn range_newer_than(&self, after: &str, limit: usize) -> StoreResult<Vec<Record>> {
        let records = self.records.read();
        Ok(records
            .range((Bound::Excluded(after.to_string()), Bound::Unbounded))
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn range_older_than(&self, before: &str, limit: usize) -> StoreResult<Vec<Record>> {
        let records = self.records.read();
        Ok(records
            .range(..before.to_string())
            .rev()
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn newest(&self, limit: usize) -> StoreResult<Vec<Record>> {
        let records = self.records.read();
        Ok(records
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    fn newest_single(&self) -> StoreResult<Option<Record>> {
        Ok(self.records.read().values().next_back().cloned())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Record>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn upsert(&self, record: Record) -> StoreResult<()> {
        self.records.write().insert(record.id.clone(), record);
        Ok(())
    }

    fn tombstone(&self, id: &str, version: u64) -> StoreResult<bool> {
        let mut records = self.records.write();
        match records.get_mut(id) {
            Some(record) => {
                record.deleted = true;
                record.last_modified_version = version;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Record {
        Record {
            id: id.to_string(),
            owner_handle: "h".to_string(),
            created_at: 0,
            body: String::new(),
            asset_mask: 1,
            deleted: false,
            last_modified_version: 0,
        }
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    fn store_abc() -> MemoryRecordStore {
        MemoryRecordStore::from_records(vec![record("a"), record("b"), record("c")])
    }

    #[test]
    fn newer_than_is_ascending_and_exclusive() {
        let store = store_abc();
        let rows = store.range_newer_than("a", 10).unwrap();
        assert_eq!(ids(&rows), vec!["b", "c"]);

        let rows = store.range_newer_than("a", 1).unwrap();
        assert_eq!(ids(&rows), vec!["b"]);

        assert!(store.range_newer_than("c", 10).unwrap().is_empty());
    }

    #[test]
    fn older_than_is_descending_and_exclusive() {
        let store = store_abc();
        let rows = store.range_older_than("c", 10).unwrap();
        assert_eq!(ids(&rows), vec!["b", "a"]);

        let rows = store.range_older_than("c", 1).unwrap();
        assert_eq!(ids(&rows), vec!["b"]);

        assert!(store.range_older_than("a", 10).unwrap().is_empty());
    }

    #[test]
    fn newest_is_descending() {
        let store = store_abc();
        assert_eq!(ids(&store.newest(2).unwrap()), vec!["c", "b"]);
        assert_eq!(store.newest_single().unwrap().unwrap().id, "c");

        let empty = MemoryRecordStore::new();
        assert!(empty.newest(5).unwrap().is_empty());
        assert!(empty.newest_single().unwrap().is_none());
    }

    #[test]
    fn upsert_replaces_by_id() {
        let store = store_abc();
        let mut updated = record("b");
        updated.body = "changed".to_string();
        store.upsert(updated).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("b").unwrap().unwrap().body, "changed");
    }

    #[test]
    fn tombstone_keeps_row_and_bumps_version() {
        let store = store_abc();
        assert!(store.tombstone("b", 7).unwrap());
        assert!(!store.tombstone("missing", 8).unwrap());

        let row = store.get("b").unwrap().unwrap();
        assert!(row.deleted);
        assert_eq!(row.last_modified_version, 7);
        // Tombstones still participate in range queries.
        assert_eq!(store.len(), 3);
        assert_eq!(ids(&store.range_newer_than("a", 10).unwrap()), vec!["b", "c"]);
    }
}
