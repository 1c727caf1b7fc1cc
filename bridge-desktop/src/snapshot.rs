//! Snapshot Store Implementation
//!
//! Persists the serialized playlist collection to a single file in the
//! application data directory. Saves go through a temp file and rename so a
//! crash mid-write leaves either the old or the new snapshot, never a torn
//! one.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SnapshotStore,
};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// File-backed snapshot store.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Snapshot file in the platform data directory.
    pub fn in_default_location() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("playlist-sync-core");
        Self::new(data_dir.join("playlists.bin"))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Option<Bytes>> {
        match fs::read(&self.path).await {
            Ok(data) => {
                debug!(path = ?self.path, size = data.len(), "Loaded playlist snapshot");
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_error(e)),
        }
    }

    async fn save(&self, data: Bytes) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(Self::map_io_error)?;
        }

        let mut tmp = self.path.clone();
        tmp.set_extension("bin.tmp");

        fs::write(&tmp, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(Self::map_io_error)?;

        debug!(path = ?self.path, size = data.len(), "Saved playlist snapshot");
        Ok(())
    }
}
