//! Client-held catch-up cursor.

use serde::{Deserialize, Serialize};

/// Round-tripped description of a client's catch-up progress.
///
/// The cursor is the only server "memory" of how far a client has
/// synchronized the record catalog. It is handed to the client inside
/// every pull response and handed back on the next pull. The server
/// never stores it.
///
/// `newest_seen_id` and `oldest_seen_id` bound the contiguous slice of
/// the catalog the client holds. `backfill_complete` marks the older
/// axis as exhausted; newer content can still arrive after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    /// Id of the newest record the client has applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_seen_id: Option<String>,
    /// Id of the oldest record the client has applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_seen_id: Option<String>,
    /// True once the backfill axis is exhausted.
    #[serde(default)]
    pub backfill_complete: bool,
    /// Pull round counter, for client progress display only.
    #[serde(default)]
    pub page: u32,
    /// Server schema version the cursor was minted under.
    #[serde(default)]
    pub schema_version: u32,
}

impl Cursor {
    /// Creates the cursor handed out after a bootstrap pull.
    pub fn bootstrap(
        newest_seen_id: Option<String>,
        oldest_seen_id: Option<String>,
        backfill_complete: bool,
        schema_version: u32,
    ) -> Self {
        Self {
            newest_seen_id,
            oldest_seen_id,
            backfill_complete,
            page: 1,
            schema_version,
        }
    }

    /// Serializes the cursor as the JSON cookie value.
    pub fn to_cookie(&self) -> serde_json::Value {
        // Cursor fields are plain scalars; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Outcome of validating an incoming cookie.
///
/// The cookie is untrusted input: it may be absent (new client), fail
/// to decode (corrupted replica), or carry a stale schema version
/// (server-side format change). All three collapse to a reset; there
/// is no partial migration of cursor shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState {
    /// No usable cursor. The replica must be rebuilt from the newest
    /// records. `stale_replica` is true when the client held local
    /// state that must be wiped before anything else is applied.
    Uninitialized {
        /// Whether the client's replica is known-bad and must be cleared
        /// even if the bootstrap query comes back empty.
        stale_replica: bool,
    },
    /// The cursor decoded cleanly and sync continues from its bounds.
    Tracking(Cursor),
}

impl CursorState {
    /// Classifies an incoming cookie against the current schema version.
    pub fn decode(cookie: Option<&serde_json::Value>, schema_version: u32) -> Self {
        let value = match cookie {
            None | Some(serde_json::Value::Null) => {
                return CursorState::Uninitialized {
                    stale_replica: false,
                }
            }
            Some(value) => value,
        };

        let cursor: Cursor = match serde_json::from_value(value.clone()) {
            Ok(cursor) => cursor,
            Err(_) => {
                // Undecodable cookie means the client replayed something
                // we never minted. Whatever replica it guards is suspect.
                return CursorState::Uninitialized {
                    stale_replica: true,
                };
            }
        };

        if cursor.schema_version != schema_version {
            return CursorState::Uninitialized {
                stale_replica: true,
            };
        }

        if cursor.newest_seen_id.is_none() {
            return CursorState::Uninitialized {
                stale_replica: false,
            };
        }

        CursorState::Tracking(cursor)
    }
}
