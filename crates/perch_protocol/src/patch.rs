//! Patch operations and the patch encoder.

use serde::{Deserialize, Serialize};

/// A single operation in a sync patch.
///
/// Clients apply a patch left to right against their local replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PatchOp {
    /// Wipe the local replica. Only emitted at bootstrap or reset.
    Clear,
    /// Remove the entry for `key`.
    Del {
        /// Key to remove.
        key: String,
    },
    /// Insert or replace the entry for `key`. The value never repeats
    /// the key field.
    Put {
        /// Key to upsert.
        key: String,
        /// Entry body, excluding the key itself.
        value: serde_json::Value,
    },
}

impl PatchOp {
    /// Returns the key this operation touches, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            PatchOp::Clear => None,
            PatchOp::Del { key } | PatchOp::Put { key, .. } => Some(key),
        }
    }
}

/// Builds a patch with the transport ordering guarantee.
///
/// Operations are emitted as `clear`, then deletions, then puts, so a
/// client replaying the list never observes a put it is about to
/// delete. Within each class, input order is preserved: the encoding
/// is deterministic for a fixed input sequence.
#[derive(Debug, Default)]
pub struct PatchBuilder {
    clear: bool,
    dels: Vec<PatchOp>,
    puts: Vec<PatchOp>,
}

impl PatchBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a leading `clear` op.
    pub fn clear(&mut self) -> &mut Self {
        self.clear = true;
        self
    }

    /// Adds a deletion.
    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.dels.push(PatchOp::Del { key: key.into() });
        self
    }

    /// Adds an upsert.
    pub fn put(&mut self, key: impl Into<String>, value: serde_json::Value) -> &mut Self {
        self.puts.push(PatchOp::Put {
            key: key.into(),
            value,
        });
        self
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        !self.clear && self.dels.is_empty() && self.puts.is_empty()
    }

    /// Finishes the patch in transport order.
    pub fn build(self) -> Vec<PatchOp> {
        let mut ops = Vec::with_capacity(usize::from(self.clear) + self.dels.len() + self.puts.len());
        if self.clear {
            ops.push(PatchOp::Clear);
        }
        ops.extend(self.dels);
        ops.extend(self.puts);
        ops
    }
}
