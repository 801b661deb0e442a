//! Pull handlers: the catch-up cursor engine and the annotation delta.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use perch_protocol::{
    AnnotationPullRequest, Cursor, CursorState, PatchBuilder, PullResponse, RecordPullRequest,
};
use perch_store::{AnnotationStore, ClientRegistry, Record, RecordStore};
use std::collections::BTreeMap;

/// Runs one round of the catch-up state machine for the record catalog.
///
/// The decoded cursor picks one of three branches:
///
/// - **Uninitialized**: bootstrap from the newest records so a brand
///   new client can render immediately instead of replaying history.
/// - **Newer content pending**: stream records above `newest_seen_id`.
///   Newer always beats older, so clients converge to live content
///   before spending round-trips on backfill.
/// - **Backfill**: page below `oldest_seen_id` until exhausted.
///
/// Records hidden by the asset filter still bound the cursor; cursor
/// correctness must not depend on a presentation filter that can
/// change independently.
pub(crate) fn pull_records<R: RecordStore>(
    store: &R,
    config: &ServerConfig,
    request: &RecordPullRequest,
) -> ServerResult<PullResponse> {
    let limit = config.clamp_limit(request.limit);

    match CursorState::decode(request.cookie.as_ref(), config.schema_version) {
        CursorState::Uninitialized { stale_replica } => {
            bootstrap(store, config, limit, stale_replica)
        }
        CursorState::Tracking(cursor) => {
            let head = store.newest_single()?;
            match head {
                Some(head) if newer_pending(&cursor, &head) => {
                    catch_up_newer(store, cursor, limit)
                }
                Some(head) => backfill(store, cursor, head, limit),
                // The catalog emptied out from under a tracking cursor.
                // Records are only ever tombstoned, so this means the
                // store was rebuilt; nothing to serve.
                None => Ok(PullResponse::with_cursor(&cursor, Vec::new())),
            }
        }
    }
}

fn newer_pending(cursor: &Cursor, head: &Record) -> bool {
    cursor
        .newest_seen_id
        .as_deref()
        .is_some_and(|newest| head.id.as_str() > newest)
}

/// Bootstrap: wipe the replica and serve the newest page.
fn bootstrap<R: RecordStore>(
    store: &R,
    config: &ServerConfig,
    limit: usize,
    stale_replica: bool,
) -> ServerResult<PullResponse> {
    let rows = store.newest(limit)?;

    let mut patch = PatchBuilder::new();
    if stale_replica || !rows.is_empty() {
        patch.clear();
    }
    emit_rows(&mut patch, &rows);

    let cursor = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => {
            tracing::debug!(
                newest = %first.id,
                oldest = %last.id,
                count = rows.len(),
                "bootstrapping client from newest page"
            );
            Cursor::bootstrap(
                Some(first.id.clone()),
                Some(last.id.clone()),
                false,
                config.schema_version,
            )
        }
        // Empty catalog: nothing to backfill either.
        _ => Cursor::bootstrap(None, None, true, config.schema_version),
    };

    Ok(PullResponse::with_cursor(&cursor, patch.build()))
}

/// Newer-content branch: ascending page above the newest seen id,
/// applied oldest-first so the client observes a causally sane order.
fn catch_up_newer<R: RecordStore>(
    store: &R,
    mut cursor: Cursor,
    limit: usize,
) -> ServerResult<PullResponse> {
    // Tracking cursors always carry newest_seen_id; decode guarantees it.
    let newest_seen = cursor.newest_seen_id.clone().unwrap_or_default();
    let rows = store.range_newer_than(&newest_seen, limit)?;

    let mut patch = PatchBuilder::new();
    emit_rows(&mut patch, &rows);

    if let Some(last) = rows.last() {
        cursor.newest_seen_id = Some(last.id.clone());
        cursor.backfill_complete = false;
        cursor.page += 1;
        if cursor.oldest_seen_id.is_none() {
            // First contentful pull for a cursor minted against an
            // empty catalog: seed the backfill bound too.
            cursor.oldest_seen_id = rows.first().map(|r| r.id.clone());
        }
        tracing::debug!(
            newest = %last.id,
            count = rows.len(),
            page = cursor.page,
            "served newer records"
        );
    }

    Ok(PullResponse::with_cursor(&cursor, patch.build()))
}

/// Backfill branch: descending page below the oldest seen id.
fn backfill<R: RecordStore>(
    store: &R,
    mut cursor: Cursor,
    head: Record,
    limit: usize,
) -> ServerResult<PullResponse> {
    let oldest_seen = match cursor.oldest_seen_id.clone() {
        Some(id) => id,
        // Never backfilled before: start just below the catalog head.
        None => {
            cursor.oldest_seen_id = Some(head.id.clone());
            head.id
        }
    };

    let rows = store.range_older_than(&oldest_seen, limit)?;

    let mut patch = PatchBuilder::new();
    emit_rows(&mut patch, &rows);

    match rows.last() {
        Some(last) => {
            cursor.oldest_seen_id = Some(last.id.clone());
            cursor.backfill_complete = false;
            cursor.page += 1;
            tracing::debug!(
                oldest = %last.id,
                count = rows.len(),
                page = cursor.page,
                "served backfill page"
            );
        }
        None => {
            cursor.backfill_complete = true;
            tracing::debug!("backfill complete");
        }
    }

    Ok(PullResponse::with_cursor(&cursor, patch.build()))
}

/// Emits patch ops for a page of records.
///
/// Tombstones become deletions; live records without visible assets
/// are consulted for cursor bounds upstream but never shipped.
fn emit_rows(patch: &mut PatchBuilder, rows: &[Record]) {
    for row in rows {
        if row.deleted {
            patch.del(row.id.clone());
        } else if row.has_visible_assets() {
            patch.put(row.id.clone(), row.patch_value());
        }
    }
}

/// Serves the per-user annotation delta.
///
/// The cookie is the group version the client last saw. Unknown groups
/// are "nothing to sync yet", not errors; they are created lazily on
/// first push.
pub(crate) fn pull_annotations(
    registry: &ClientRegistry,
    annotations: &AnnotationStore,
    request: &AnnotationPullRequest,
) -> ServerResult<PullResponse> {
    let prev_version = request.cookie.unwrap_or(0);
    let noop = || PullResponse::noop(serde_json::Value::from(prev_version));

    let Some(group_id) = request.client_group_id.as_deref() else {
        return Ok(noop());
    };
    let Some(group) = registry.group(group_id) else {
        tracing::debug!(group = group_id, "annotation pull for unknown group");
        return Ok(noop());
    };
    let Some(principal) = group.owner_principal.as_deref() else {
        return Ok(noop());
    };

    let last_mutation_id_changes: BTreeMap<String, u64> = registry
        .clients_changed_since(group_id, prev_version)
        .into_iter()
        .map(|client| (client.id, client.last_mutation_id))
        .collect();

    let mut patch = PatchBuilder::new();
    for row in annotations.changed_since(principal, prev_version) {
        if row.deleted {
            patch.del(row.record_id.clone());
        } else {
            patch.put(row.record_id.clone(), row.patch_value());
        }
    }

    Ok(PullResponse::with_version(
        group.version,
        last_mutation_id_changes,
        patch.build(),
    ))
}
