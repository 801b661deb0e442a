//! Client and client-group registry.

use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One logical end-user across devices.
///
/// Created lazily on first pull or push that references an unknown id;
/// never deleted by the sync core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientGroup {
    /// Group id, chosen by the client.
    pub id: String,
    /// Principal that owns this group, once one has authenticated.
    pub owner_principal: Option<String>,
    /// Highest version of any row belonging to this group's principal.
    /// Doubles as the annotation pull cookie.
    pub version: u64,
}

/// One device or browser session within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Client id, chosen by the client.
    pub id: String,
    /// Owning group.
    pub client_group_id: String,
    /// Dedup watermark: mutations with id at or below this have been
    /// applied and replays are no-ops.
    pub last_mutation_id: u64,
    /// Version stamped when the watermark last advanced.
    pub last_modified_version: u64,
}

/// Tracks groups and clients for mutation dedup and delta scoping.
///
/// Watermark advancement is a compare-and-swap: a losing concurrent
/// writer gets a conflict back and must re-read, never silently
/// overwriting a newer watermark. That keeps push handling stateless
/// and horizontally scalable.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    groups: RwLock<HashMap<String, ClientGroup>>,
    clients: RwLock<HashMap<String, Client>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches a group, creating it lazily.
    ///
    /// A group created here adopts `principal` as its owner. An
    /// existing ownerless group is claimed by the first authenticated
    /// principal that touches it; a group owned by someone else is a
    /// cross-tenant access and is refused.
    pub fn ensure_group(&self, id: &str, principal: Option<&str>) -> StoreResult<ClientGroup> {
        let mut groups = self.groups.write();
        let group = groups.entry(id.to_string()).or_insert_with(|| ClientGroup {
            id: id.to_string(),
            owner_principal: principal.map(str::to_string),
            version: 0,
        });

        match (&group.owner_principal, principal) {
            (Some(owner), Some(caller)) if owner != caller => {
                return Err(StoreError::ForeignClientGroup {
                    group: id.to_string(),
                })
            }
            (None, Some(caller)) => {
                tracing::debug!(group = id, principal = caller, "claiming ownerless group");
                group.owner_principal = Some(caller.to_string());
            }
            _ => {}
        }

        Ok(group.clone())
    }

    /// Looks up a group without creating it.
    pub fn group(&self, id: &str) -> Option<ClientGroup> {
        self.groups.read().get(id).cloned()
    }

    /// Fetches a client, creating it lazily inside `group_id`.
    ///
    /// A client id already attached to a different group indicates a
    /// confused or malicious caller.
    pub fn ensure_client(&self, id: &str, group_id: &str) -> StoreResult<Client> {
        let mut clients = self.clients.write();
        let client = clients.entry(id.to_string()).or_insert_with(|| Client {
            id: id.to_string(),
            client_group_id: group_id.to_string(),
            last_mutation_id: 0,
            last_modified_version: 0,
        });

        if client.client_group_id != group_id {
            return Err(StoreError::ClientGroupMismatch {
                client: id.to_string(),
                group: client.client_group_id.clone(),
            });
        }

        Ok(client.clone())
    }

    /// Looks up a client without creating it.
    pub fn client(&self, id: &str) -> Option<Client> {
        self.clients.read().get(id).cloned()
    }

    /// Advances a client's watermark by compare-and-swap.
    ///
    /// Succeeds only if the stored watermark still equals `expected`.
    pub fn advance_client(
        &self,
        client_id: &str,
        expected: u64,
        mutation_id: u64,
        version: u64,
    ) -> StoreResult<()> {
        let mut clients = self.clients.write();
        let client = clients
            .get_mut(client_id)
            .ok_or_else(|| StoreError::Unavailable(format!("unknown client {client_id}")))?;

        if client.last_mutation_id != expected {
            return Err(StoreError::WatermarkConflict {
                expected,
                actual: client.last_mutation_id,
            });
        }

        client.last_mutation_id = mutation_id;
        client.last_modified_version = version;
        Ok(())
    }

    /// Raises a group's version. Versions only move forward.
    pub fn touch_group(&self, group_id: &str, version: u64) {
        if let Some(group) = self.groups.write().get_mut(group_id) {
            if version > group.version {
                group.version = version;
            }
        }
    }

    /// Clients of `group_id` whose watermark changed after `version`.
    pub fn clients_changed_since(&self, group_id: &str, version: u64) -> Vec<Client> {
        let mut changed: Vec<Client> = self
            .clients
            .read()
            .values()
            .filter(|client| {
                client.client_group_id == group_id && client.last_modified_version > version
            })
            .cloned()
            .collect();
        changed.sort_by(|a, b| a.id.cmp(&b.id));
        changed
    }
}
