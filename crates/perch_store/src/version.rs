//! Version authority.

use std::sync::atomic::{AtomicU64, Ordering};

/// Issues a monotonically increasing version to every committed
/// mutation.
///
/// Source of truth for "has anything changed since version V". No
/// version is ever reused; gaps are permitted. The caller persists the
/// stamped row atomically with the version it consumed: if persistence
/// fails, the version is simply burned and the mutation stays
/// invisible to pulls.
#[derive(Debug)]
pub struct VersionAuthority {
    current: AtomicU64,
}

impl VersionAuthority {
    /// Creates an authority starting at version 0.
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// Creates an authority resuming from `current`, e.g. after a
    /// snapshot restore.
    pub fn resume_at(current: u64) -> Self {
        Self {
            current: AtomicU64::new(current),
        }
    }

    /// Issues the next version.
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The most recently issued version.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

impl Default for VersionAuthority {
    fn default() -> Self {
        Self::new()
    }
}
