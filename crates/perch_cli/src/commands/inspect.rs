//! Inspect command implementation.

use perch_store::Snapshot;
use serde::Serialize;
use std::path::Path;

/// Snapshot inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Snapshot path.
    pub path: String,
    /// Number of live records.
    pub record_count: usize,
    /// Number of tombstoned records.
    pub tombstone_count: usize,
    /// Records hidden from clients by the asset filter.
    pub hidden_count: usize,
    /// Newest record id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_id: Option<String>,
    /// Oldest record id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_id: Option<String>,
    /// Number of annotations, tombstones included.
    pub annotation_count: usize,
    /// Last issued version.
    pub version: u64,
}

/// Runs the inspect command.
pub fn run(snapshot_path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !snapshot_path.exists() {
        return Err(format!("No snapshot found at {:?}", snapshot_path).into());
    }

    let snapshot = Snapshot::load(snapshot_path)?;

    let tombstone_count = snapshot.records.iter().filter(|r| r.deleted).count();
    let hidden_count = snapshot
        .records
        .iter()
        .filter(|r| !r.deleted && !r.has_visible_assets())
        .count();

    let result = InspectResult {
        path: snapshot_path.display().to_string(),
        record_count: snapshot.records.len() - tombstone_count,
        tombstone_count,
        hidden_count,
        newest_id: snapshot.records.last().map(|r| r.id.clone()),
        oldest_id: snapshot.records.first().map(|r| r.id.clone()),
        annotation_count: snapshot.annotations.len(),
        version: snapshot.version,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            println!("Snapshot: {}", result.path);
            println!("  Records:     {}", result.record_count);
            println!("  Tombstones:  {}", result.tombstone_count);
            println!("  Hidden:      {}", result.hidden_count);
            if let Some(newest) = &result.newest_id {
                println!("  Newest id:   {newest}");
            }
            if let Some(oldest) = &result.oldest_id {
                println!("  Oldest id:   {oldest}");
            }
            println!("  Annotations: {}", result.annotation_count);
            println!("  Version:     {}", result.version);
        }
    }

    Ok(())
}
