use crate::domain::snapshot::{ItemRecord, Snapshot};
use crate::store::{SnapshotError, SnapshotStore};
use crate::time::half_day::Slot;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const BOM: char = '\u{feff}';

/// One CSV file per (category, date, half) under a single data directory.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    data_dir: PathBuf,
}

pub fn snapshot_file_name(category: &str, slot: Slot) -> String {
    format!(
        "{category}_{}_{}.csv",
        slot.date.format("%Y-%m-%d"),
        slot.half
    )
}

impl FileSnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, category: &str, slot: Slot) -> PathBuf {
        self.data_dir.join(snapshot_file_name(category, slot))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, category: &str, slot: Slot) -> Result<Snapshot, SnapshotError> {
        let path = self.path_for(category, slot);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SnapshotError::NotFound {
                    category: category.to_string(),
                    slot,
                });
            }
            Err(source) => return Err(SnapshotError::Io { path, source }),
        };

        let body = text.strip_prefix(BOM).unwrap_or(&text);
        let mut reader = csv::Reader::from_reader(body.as_bytes());
        let mut items = Vec::new();
        for row in reader.deserialize::<ItemRecord>() {
            match row {
                Ok(item) => items.push(item),
                Err(source) => return Err(SnapshotError::Csv { path, source }),
            }
        }
        items.sort_by_key(|item| item.rank);

        tracing::debug!(path = %path.display(), items = items.len(), "loaded snapshot");

        Ok(Snapshot {
            category: category.to_string(),
            slot,
            items,
        })
    }

    fn save(&self, snapshot: &Snapshot) -> Result<PathBuf, SnapshotError> {
        snapshot
            .validate()
            .map_err(|source| SnapshotError::Invalid {
                category: snapshot.category.clone(),
                slot: snapshot.slot,
                source,
            })?;

        fs::create_dir_all(&self.data_dir).map_err(|source| SnapshotError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let path = self.path_for(&snapshot.category, snapshot.slot);
        let tmp_path = path.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&tmp_path).map_err(|source| SnapshotError::Csv {
            path: tmp_path.clone(),
            source,
        })?;
        let mut items: Vec<&ItemRecord> = snapshot.items.iter().collect();
        items.sort_by_key(|item| item.rank);
        for item in items {
            writer.serialize(item).map_err(|source| SnapshotError::Csv {
                path: tmp_path.clone(),
                source,
            })?;
        }
        writer.flush().map_err(|source| SnapshotError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        drop(writer);

        // Readers only ever see a complete file.
        fs::rename(&tmp_path, &path).map_err(|source| SnapshotError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            category = %snapshot.category,
            slot = %snapshot.slot,
            items = snapshot.items.len(),
            "saved snapshot"
        );
        Ok(path)
    }
}
