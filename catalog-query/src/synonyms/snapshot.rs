//! Persistence of the alias cache.
//!
//! The cache is stored as a single JSON object mapping each target to its
//! alias list. Saves replace the whole file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;

/// Target name → ordered alias list.
pub type SynonymMap = BTreeMap<String, Vec<String>>;

/// Error type for snapshot loading and saving.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid snapshot: {0}")]
    Format(#[from] serde_json::Error),
    #[error("Failed to replace snapshot: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Where the alias cache lives between runs.
pub trait SnapshotStore: Send + Sync {
    /// Load the stored mapping; a store with nothing saved yields an empty map.
    fn load(&self) -> Result<SynonymMap, SnapshotError>;

    /// Replace the stored mapping.
    fn save(&self, map: &SynonymMap) -> Result<(), SnapshotError>;
}

/// JSON snapshot file at a fixed path.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the snapshot, so readers never see a partial file. Concurrent saves
/// are serialized.
#[derive(Debug)]
pub struct JsonSnapshotFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonSnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonSnapshotFile {
    fn load(&self) -> Result<SynonymMap, SnapshotError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SynonymMap::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn save(&self, map: &SynonymMap) -> Result<(), SnapshotError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, map)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Snapshot kept in memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    map: Mutex<SynonymMap>,
    saves: AtomicUsize,
}

impl MemorySnapshot {
    pub fn new(map: SynonymMap) -> Self {
        Self {
            map: Mutex::new(map),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the last saved mapping.
    pub fn contents(&self) -> SynonymMap {
        self.map.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SnapshotStore for MemorySnapshot {
    fn load(&self) -> Result<SynonymMap, SnapshotError> {
        Ok(self.contents())
    }

    fn save(&self, map: &SynonymMap) -> Result<(), SnapshotError> {
        *self.map.lock().unwrap_or_else(PoisonError::into_inner) = map.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
