//! Bootstrap command implementation.
//!
//! Replays the pull loop a brand new client would run, against a local
//! snapshot. Useful for checking how many round-trips a full sync costs
//! at a given page size before changing production limits.

use perch_protocol::{Cursor, PatchOp, RecordPullRequest};
use perch_server::{ServerConfig, SyncServer};
use perch_store::Snapshot;
use std::path::Path;

/// Runs the bootstrap command.
pub fn run(
    snapshot_path: &Path,
    limit: usize,
    rounds: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if !snapshot_path.exists() {
        return Err(format!("No snapshot found at {:?}", snapshot_path).into());
    }

    let (records, annotations, versions) = Snapshot::load(snapshot_path)?.restore();
    let server = SyncServer::from_parts(ServerConfig::default(), records, annotations, versions);

    let mut cookie = None;
    let mut puts = 0usize;
    let mut dels = 0usize;

    for round in 1..=rounds {
        let response = server.handle_pull_records(&RecordPullRequest {
            cookie,
            client_group_id: None,
            limit: Some(limit),
        })?;

        let mut round_puts = 0usize;
        let mut round_dels = 0usize;
        for op in &response.patch {
            match op {
                PatchOp::Put { .. } => round_puts += 1,
                PatchOp::Del { .. } => round_dels += 1,
                PatchOp::Clear => {}
            }
        }
        puts += round_puts;
        dels += round_dels;

        let cursor: Cursor = serde_json::from_value(response.cookie.clone())?;
        println!(
            "round {round}: {round_puts} puts, {round_dels} dels (page {}, oldest {})",
            cursor.page,
            cursor.oldest_seen_id.as_deref().unwrap_or("-"),
        );

        if cursor.backfill_complete {
            println!("Converged after {round} rounds: {puts} puts, {dels} dels");
            return Ok(());
        }
        cookie = Some(response.cookie);
    }

    Err(format!("did not converge within {rounds} rounds").into())
}
