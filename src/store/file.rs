//! Filesystem record store
//!
//! ```text
//! <root>/participants/<participant_id>.json[.gz]
//! <root>/experiments/<participant_id>.<experiment_id>.json[.gz]
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::TempDir;

use super::{Codec, RecordKey, RecordKind, RecordStore};
use crate::Result;

/// Record store rooted at a directory.
///
/// Writes go to a temp file in the target directory, are synced, and are
/// renamed over the destination, so a crash mid-write leaves the previous
/// version of the record intact.
#[derive(Debug)]
pub struct FileRecordStore {
    root: PathBuf,
    // Keeps the fallback directory alive for as long as the store.
    tempdir: Option<TempDir>,
}

impl FileRecordStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            root: root.into(),
            tempdir: None,
        };
        store.provision()?;
        tracing::debug!(root = %store.root.display(), "opened record store");
        Ok(store)
    }

    /// Open a store in a fresh temporary directory, deleted on drop.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the temporary directory cannot be created.
    pub fn ephemeral() -> Result<Self> {
        let tempdir = tempfile::Builder::new().prefix("expflow-").tempdir()?;
        let store = Self {
            root: tempdir.path().to_path_buf(),
            tempdir: Some(tempdir),
        };
        store.provision()?;
        tracing::warn!(
            root = %store.root.display(),
            "Using temporary directory; data will be lost when program ends"
        );
        Ok(store)
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding records of `kind`.
    #[must_use]
    pub fn dir(&self, kind: RecordKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Path of `key` under `codec`.
    #[must_use]
    pub fn path_for(&self, key: &RecordKey, codec: Codec) -> PathBuf {
        self.dir(key.kind()).join(key.file_name(codec))
    }

    fn provision(&self) -> Result<()> {
        for kind in [RecordKind::Participant, RecordKind::Experiment] {
            fs::create_dir_all(self.dir(kind))?;
        }
        Ok(())
    }
}

impl RecordStore for FileRecordStore {
    fn read(&self, key: &RecordKey) -> Result<Option<(Codec, Vec<u8>)>> {
        let mut found = None;
        for codec in Codec::ALL {
            let path = self.path_for(key, codec);
            match fs::read(&path) {
                Ok(bytes) if found.is_none() => found = Some((codec, bytes)),
                Ok(_) => tracing::warn!(
                    path = %path.display(),
                    "record stored under both codecs; ignoring the compressed copy"
                ),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(found)
    }

    fn write(&self, key: &RecordKey, codec: Codec, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key, codec);
        atomic_write(&path, bytes)?;
        for other in Codec::ALL.into_iter().filter(|c| *c != codec) {
            remove_if_present(&self.path_for(key, other))?;
        }
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote record");
        Ok(())
    }

    fn delete(&self, key: &RecordKey) -> Result<bool> {
        let mut removed = false;
        for codec in Codec::ALL {
            removed |= remove_if_present(&self.path_for(key, codec))?;
        }
        Ok(removed)
    }

    fn keys(&self, kind: RecordKind) -> Result<Vec<RecordKey>> {
        let dir = self.dir(kind);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some((key, _)) = name
                .to_str()
                .and_then(|name| RecordKey::from_file_name(kind, name))
            {
                keys.push(key);
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn exists(&self, key: &RecordKey) -> Result<bool> {
        for codec in Codec::ALL {
            if self.path_for(key, codec).try_exists()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_ephemeral(&self) -> bool {
        self.tempdir.is_some()
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("record");
    let tmp = dir.join(format!(
        ".{name}.tmp.{}.{}",
        std::process::id(),
        Utc::now().timestamp_micros()
    ));
    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    if let Ok(dir) = fs::File::open(dir) {
        let _ = dir.sync_all();
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
