//! Push handler: the mutation processor.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use perch_protocol::{Mutation, PushRequest, PushResponse};
use perch_store::{
    AnnotationStore, ClientRegistry, MarkKind, StoreError, VersionAuthority,
};

/// A mutation's named effect, decoded from `name` and `args`.
#[derive(Debug, PartialEq, Eq)]
enum MutatorEffect {
    /// Place or update a mark on a record.
    Mark {
        record_id: String,
        kind: MarkKind,
        tags: Vec<String>,
    },
    /// Remove a mark from a record.
    Unmark { record_id: String },
}

impl MutatorEffect {
    /// Decodes a client mutator invocation. Unknown names and
    /// malformed arguments are per-mutation rejections, not batch
    /// failures.
    fn decode(mutation: &Mutation) -> Result<Self, String> {
        match mutation.name.as_str() {
            "markTweet" => {
                let record_id = mutation.args["id"]
                    .as_str()
                    .ok_or("markTweet requires a string `id`")?
                    .to_string();
                let kind = mutation.args["mark"]
                    .as_str()
                    .and_then(MarkKind::parse)
                    .ok_or("markTweet requires a known `mark`")?;
                let tags = mutation.args["tags"]
                    .as_array()
                    .map(|tags| {
                        tags.iter()
                            .filter_map(|t| t.as_str())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(MutatorEffect::Mark {
                    record_id,
                    kind,
                    tags,
                })
            }
            "removeTweet" => {
                let record_id = mutation
                    .args
                    .as_str()
                    .ok_or("removeTweet requires a string record id")?
                    .to_string();
                Ok(MutatorEffect::Unmark { record_id })
            }
            other => Err(format!("unknown mutator `{other}`")),
        }
    }
}

/// Applies a push batch in submission order.
///
/// Per mutation: resolve the client row (created lazily), skip replays
/// at or below the watermark, reject id gaps without failing the
/// batch, apply the named effect stamped with a fresh version, and
/// advance the watermark by compare-and-swap. Effects are scoped to
/// the authenticated principal, so cross-tenant writes are
/// unrepresentable; group ownership is still checked up front.
pub(crate) fn handle_push(
    registry: &ClientRegistry,
    annotations: &AnnotationStore,
    versions: &VersionAuthority,
    config: &ServerConfig,
    principal: &str,
    request: &PushRequest,
) -> ServerResult<PushResponse> {
    if request.mutations.len() > config.max_push_batch {
        return Err(ServerError::InvalidRequest(format!(
            "too many mutations: {} > {}",
            request.mutations.len(),
            config.max_push_batch
        )));
    }

    let group = registry.ensure_group(&request.client_group_id, Some(principal))?;
    let mut accepted = 0u32;

    for mutation in &request.mutations {
        let client = registry.ensure_client(&mutation.client_id, &group.id)?;

        if mutation.id <= client.last_mutation_id {
            tracing::debug!(
                client = %mutation.client_id,
                mutation = mutation.id,
                watermark = client.last_mutation_id,
                "skipping replayed mutation"
            );
            continue;
        }

        if mutation.id != client.last_mutation_id + 1 {
            // Client desync. Reject the stray mutation and keep the
            // batch going; the client will resubmit from its watermark.
            tracing::warn!(
                client = %mutation.client_id,
                mutation = mutation.id,
                expected = client.last_mutation_id + 1,
                "mutation id gap, rejecting mutation"
            );
            continue;
        }

        let effect = match MutatorEffect::decode(mutation) {
            Ok(effect) => effect,
            Err(reason) => {
                tracing::warn!(
                    client = %mutation.client_id,
                    mutation = mutation.id,
                    name = %mutation.name,
                    reason,
                    "rejecting mutation"
                );
                // The watermark still advances: a rejected mutation is
                // consumed, not retried forever.
                let version = versions.next();
                advance_watermark(registry, mutation, client.last_mutation_id, version)?;
                registry.touch_group(&group.id, version);
                continue;
            }
        };

        let version = versions.next();
        match effect {
            MutatorEffect::Mark {
                record_id,
                kind,
                tags,
            } => {
                annotations.upsert_mark(
                    principal,
                    &record_id,
                    kind,
                    tags,
                    version,
                    mutation.timestamp,
                );
            }
            MutatorEffect::Unmark { record_id } => {
                if !annotations.tombstone(principal, &record_id, version, mutation.timestamp) {
                    tracing::debug!(record = %record_id, "unmark of absent annotation");
                }
            }
        }

        advance_watermark(registry, mutation, client.last_mutation_id, version)?;
        registry.touch_group(&group.id, version);
        accepted += 1;
    }

    tracing::debug!(
        group = %request.client_group_id,
        batch = request.mutations.len(),
        accepted,
        "push applied"
    );

    Ok(PushResponse { accepted })
}

/// Advances the client watermark, absorbing a lost race.
///
/// A concurrent push for the same client may have advanced the
/// watermark between our read and this write. Re-read once: if the
/// other writer already covered this mutation id, the work done above
/// is last-write-wins-idempotent and the mutation counts as applied.
fn advance_watermark(
    registry: &ClientRegistry,
    mutation: &Mutation,
    expected: u64,
    version: u64,
) -> ServerResult<()> {
    match registry.advance_client(&mutation.client_id, expected, mutation.id, version) {
        Ok(()) => Ok(()),
        Err(StoreError::WatermarkConflict { actual, .. }) if actual >= mutation.id => {
            tracing::debug!(
                client = %mutation.client_id,
                mutation = mutation.id,
                watermark = actual,
                "watermark already advanced by concurrent push"
            );
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
