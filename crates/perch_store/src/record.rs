//! Catalog records.

use serde::{Deserialize, Serialize};

/// Number of binary asset slots a record can reference.
pub const ASSET_SLOTS: u32 = 5;

/// One crawled post in the public catalog.
///
/// `id` is a sortable opaque string, globally unique and immutable
/// once created; range queries over it give the sync protocol a stable
/// cursor axis even when timestamps collide. `last_modified_version`
/// only increases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Sortable primary key.
    pub id: String,
    /// Handle of the account the post was crawled from.
    pub owner_handle: String,
    /// Post creation time, Unix milliseconds.
    pub created_at: i64,
    /// Post text.
    pub body: String,
    /// Bitset of populated asset slots; bit `i` means asset `i` exists
    /// in object storage under `{id}/{i}`.
    #[serde(default)]
    pub asset_mask: u32,
    /// Tombstone flag. Records are never physically deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Version stamped by the last mutation that touched this row.
    #[serde(default)]
    pub last_modified_version: u64,
}

impl Record {
    /// Returns true if at least one asset slot is populated.
    ///
    /// The presentation layer hides asset-less records; the sync
    /// protocol still uses them for cursor boundaries.
    pub fn has_visible_assets(&self) -> bool {
        self.asset_mask != 0
    }

    /// Decodes the asset mask into populated slot indices.
    pub fn asset_indices(&self) -> Vec<u32> {
        (0..ASSET_SLOTS)
            .filter(|i| self.asset_mask & (1 << i) != 0)
            .collect()
    }

    /// Serializes the record as a patch value, excluding the key field.
    pub fn patch_value(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.remove("id");
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, mask: u32) -> Record {
        Record {
            id: id.to_string(),
            owner_handle: "crawler".to_string(),
            created_at: 1_700_000_000_000,
            body: "hello".to_string(),
            asset_mask: mask,
            deleted: false,
            last_modified_version: 0,
        }
    }

    #[test]
    fn asset_indices_decode_mask() {
        assert_eq!(record("1", 0b00101).asset_indices(), vec![0, 2]);
        assert_eq!(record("1", 0).asset_indices(), Vec::<u32>::new());
        assert!(!record("1", 0).has_visible_assets());
    }

    #[test]
    fn mask_bits_beyond_slot_count_are_ignored() {
        assert_eq!(record("1", 1 << 7).asset_indices(), Vec::<u32>::new());
    }

    #[test]
    fn patch_value_excludes_key() {
        let value = record("99", 1).patch_value();
        assert!(value.get("id").is_none());
        assert_eq!(value["ownerHandle"], json!("crawler"));
        assert_eq!(value["assetMask"], json!(1));
    }

    #[test]
    fn wire_field_names() {
        let encoded = serde_json::to_value(record("5", 3)).unwrap();
        assert_eq!(encoded["id"], json!("5"));
        assert_eq!(encoded["createdAt"], json!(1_700_000_000_000i64));
        assert_eq!(encoded["lastModifiedVersion"], json!(0));
    }
}
