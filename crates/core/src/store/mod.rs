pub mod file;

use crate::domain::snapshot::{Snapshot, StructuralError};
use crate::time::half_day::Slot;
use std::path::PathBuf;
use thiserror::Error;

pub use file::FileSnapshotStore;

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No capture exists yet for the slot. Expected on first run or after a missed fetch.
    #[error("no {category} snapshot for {slot}")]
    NotFound { category: String, slot: Slot },
    #[error("snapshot io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot file {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("refusing to save invalid {category} snapshot for {slot}: {source}")]
    Invalid {
        category: String,
        slot: Slot,
        #[source]
        source: StructuralError,
    },
}

/// Read/write access to captured snapshots, addressed by (category, slot).
pub trait SnapshotStore: Send + Sync {
    fn load(&self, category: &str, slot: Slot) -> Result<Snapshot, SnapshotError>;

    fn save(&self, snapshot: &Snapshot) -> Result<PathBuf, SnapshotError>;
}
