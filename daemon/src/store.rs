//! Snapshot file persistence.
//!
//! Every `ballotd` process works on the same `ledger.bin`. A run holds an
//! advisory lock on the sibling `ledger.lock` from load to save, so two
//! writers never commit over each other.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;

use ballot_ledger::LedgerSnapshot;

use crate::error::DaemonError;

/// A single bincode snapshot on disk. Writes go to a uniquely named temp
/// file in the same directory that is then renamed over the original, so
/// readers see the old state or the new one and never a partial file.
pub struct SnapshotStore {
    path: PathBuf,
}

/// Held for the duration of one command. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn open_lock_file(&self) -> Result<File, DaemonError> {
        fs::create_dir_all(self.dir())?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;
        Ok(file)
    }

    /// Block until no other run holds the store, then hold it exclusively.
    pub fn lock_exclusive(&self) -> Result<StoreLock, DaemonError> {
        let file = self.open_lock_file()?;
        FileExt::lock_exclusive(&file)?;
        tracing::trace!(path = %self.lock_path().display(), "store locked");
        Ok(StoreLock { file })
    }

    /// Block until no writer holds the store; other readers may share it.
    pub fn lock_shared(&self) -> Result<StoreLock, DaemonError> {
        let file = self.open_lock_file()?;
        FileExt::lock_shared(&file)?;
        Ok(StoreLock { file })
    }

    pub fn load(&self) -> Result<LedgerSnapshot, DaemonError> {
        if !self.exists() {
            return Err(DaemonError::NotInitialized(self.path.clone()));
        }
        let bytes = fs::read(&self.path)?;
        let snapshot = LedgerSnapshot::from_bytes(&bytes)?;
        tracing::debug!(
            path = %self.path.display(),
            elections = snapshot.election_count(),
            votes = snapshot.vote_count(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), DaemonError> {
        let bytes = snapshot.to_bytes()?;
        fs::create_dir_all(self.dir())?;
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot saved");
        Ok(())
    }
}
