//! Pull and push messages.
//!
//! Field spellings follow the JSON the catalog clients already speak
//! (`clientGroupID`, `lastMutationIDChanges`, ...), so the server can
//! face existing replicas without a translation layer.

use crate::cursor::Cursor;
use crate::patch::PatchOp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pull request for the record catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPullRequest {
    /// Opaque cursor from the previous pull, if any. Left as raw JSON
    /// because it is untrusted until validated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<serde_json::Value>,
    /// Requesting client group.
    #[serde(rename = "clientGroupID", default, skip_serializing_if = "Option::is_none")]
    pub client_group_id: Option<String>,
    /// Page size override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Pull request for per-user annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPullRequest {
    /// Group version the client last saw. Absent for a fresh client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<u64>,
    /// Requesting client group.
    #[serde(rename = "clientGroupID", default, skip_serializing_if = "Option::is_none")]
    pub client_group_id: Option<String>,
}

/// Pull response, shared by both pull surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Cursor (record pull) or group version (annotation pull) to
    /// round-trip on the next request.
    pub cookie: serde_json::Value,
    /// Per-client mutation watermarks that changed since the cookie.
    #[serde(rename = "lastMutationIDChanges")]
    pub last_mutation_id_changes: BTreeMap<String, u64>,
    /// Delta to apply, in transport order.
    pub patch: Vec<PatchOp>,
}

impl PullResponse {
    /// Builds a record-pull response around a cursor cookie.
    pub fn with_cursor(cursor: &Cursor, patch: Vec<PatchOp>) -> Self {
        Self {
            cookie: cursor.to_cookie(),
            last_mutation_id_changes: BTreeMap::new(),
            patch,
        }
    }

    /// Builds an annotation-pull response around a version cookie.
    pub fn with_version(
        version: u64,
        last_mutation_id_changes: BTreeMap<String, u64>,
        patch: Vec<PatchOp>,
    ) -> Self {
        Self {
            cookie: serde_json::Value::from(version),
            last_mutation_id_changes,
            patch,
        }
    }

    /// A response that changes nothing on the client.
    pub fn noop(cookie: serde_json::Value) -> Self {
        Self {
            cookie,
            last_mutation_id_changes: BTreeMap::new(),
            patch: Vec::new(),
        }
    }
}

/// One client-originated mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Client-assigned sequence number, contiguous per client.
    pub id: u64,
    /// Originating client (device/tab).
    #[serde(rename = "clientID")]
    pub client_id: String,
    /// Mutator name, e.g. `markTweet`.
    pub name: String,
    /// Mutator arguments, interpreted per name.
    #[serde(default)]
    pub args: serde_json::Value,
    /// Client wall-clock time in milliseconds. Informational only.
    #[serde(default)]
    pub timestamp: i64,
}

/// Push request: an ordered batch of mutations from one client group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    /// Browser profile id reported by the client. Informational.
    #[serde(rename = "profileID", default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    /// Client group the batch belongs to.
    #[serde(rename = "clientGroupID")]
    pub client_group_id: String,
    /// Mutations in submission order.
    pub mutations: Vec<Mutation>,
    /// Client push protocol version.
    #[serde(rename = "pushVersion", default)]
    pub push_version: u32,
    /// Client schema version string.
    #[serde(rename = "schemaVersion", default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
}

/// Push acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Number of mutations newly applied by this push. Replays and
    /// rejected mutations do not count.
    pub accepted: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_pull_request_decodes_client_json() {
        let body = json!({
            "cookie": { "newestSeenId": "9", "schemaVersion": 1 },
            "clientGroupID": "g1",
        });

        let request: RecordPullRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.client_group_id.as_deref(), Some("g1"));
        assert!(request.cookie.is_some());
        assert_eq!(request.limit, None);
    }

    #[test]
    fn pull_response_wire_shape() {
        let cursor = Cursor::bootstrap(Some("c".into()), Some("b".into()), false, 1);
        let response = PullResponse::with_cursor(&cursor, vec![PatchOp::Clear]);

        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["cookie"]["newestSeenId"], json!("c"));
        assert_eq!(encoded["lastMutationIDChanges"], json!({}));
        assert_eq!(encoded["patch"], json!([{ "op": "clear" }]));
    }

    #[test]
    fn version_cookie_is_plain_integer() {
        let mut changes = BTreeMap::new();
        changes.insert("c1".to_string(), 4u64);
        let response = PullResponse::with_version(17, changes, vec![]);

        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["cookie"], json!(17));
        assert_eq!(encoded["lastMutationIDChanges"]["c1"], json!(4));
    }

    #[test]
    fn push_request_decodes_client_json() {
        let body = json!({
            "profileID": "p1",
            "clientGroupID": "g1",
            "pushVersion": 1,
            "schemaVersion": "1",
            "mutations": [
                {
                    "id": 1,
                    "clientID": "c1",
                    "name": "markTweet",
                    "args": { "id": "t1", "mark": "bookmark" },
                    "timestamp": 1700000000000i64,
                },
            ],
        });

        let request: PushRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.client_group_id, "g1");
        assert_eq!(request.mutations.len(), 1);
        assert_eq!(request.mutations[0].client_id, "c1");
        assert_eq!(request.mutations[0].name, "markTweet");
    }

    #[test]
    fn mutation_tolerates_missing_args() {
        let body = json!({ "id": 2, "clientID": "c1", "name": "noop" });
        let mutation: Mutation = serde_json::from_value(body).unwrap();
        assert!(mutation.args.is_null());
        assert_eq!(mutation.timestamp, 0);
    }
}
