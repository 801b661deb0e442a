//! Import command implementation.

use perch_store::{MemoryRecordStore, Record, RecordStore, Snapshot};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One line of the crawled-post feed, as the scraper emits it.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    id: String,
    user: String,
    timestamp: i64,
    #[serde(default)]
    text: String,
    #[serde(rename = "imageMask", default)]
    image_mask: u32,
    #[serde(default)]
    deleted: bool,
}

impl FeedEntry {
    fn into_record(self, version: u64) -> Record {
        Record {
            id: self.id,
            owner_handle: self.user,
            created_at: self.timestamp,
            body: self.text,
            asset_mask: self.image_mask,
            deleted: self.deleted,
            last_modified_version: version,
        }
    }
}

/// Runs the import command: merges a JSON-lines feed into the snapshot.
pub fn run(
    snapshot_path: &Path,
    feed_path: &Path,
    lenient: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (records, annotations, versions) = if snapshot_path.exists() {
        Snapshot::load(snapshot_path)?.restore()
    } else {
        tracing::info!(path = %snapshot_path.display(), "creating new snapshot");
        (
            MemoryRecordStore::new(),
            perch_store::AnnotationStore::new(),
            perch_store::VersionAuthority::new(),
        )
    };

    let feed = BufReader::new(File::open(feed_path)?);
    let mut imported = 0usize;
    let mut skipped = 0usize;

    for (line_number, line) in feed.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let entry: FeedEntry = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(err) if lenient => {
                tracing::warn!(line = line_number + 1, %err, "skipping malformed feed entry");
                skipped += 1;
                continue;
            }
            Err(err) => {
                return Err(format!("feed line {}: {err}", line_number + 1).into());
            }
        };

        records.upsert(entry.into_record(versions.next()))?;
        imported += 1;
    }

    Snapshot::capture(&records, &annotations, &versions).save(snapshot_path)?;

    println!("Imported {imported} records ({skipped} skipped)");
    println!("Catalog now holds {} records at version {}", records.len(), versions.current());

    Ok(())
}
