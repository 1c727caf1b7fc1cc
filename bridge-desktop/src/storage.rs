//! Playlist Storage Implementation using Tokio
//!
//! A storage location is a local directory path; playlist files live
//! directly inside it. Listing is shallow, extension filtering is
//! case-insensitive, and modification times are reported in milliseconds
//! since epoch.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{ExternalFileRecord, PlaylistStorage},
};
use bytes::Bytes;
use std::io::ErrorKind;
use tokio::fs;
use tracing::debug;

/// Tokio-based playlist storage over the local filesystem.
pub struct TokioPlaylistStorage;

impl TokioPlaylistStorage {
    pub fn new() -> Self {
        Self
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }

    fn modified_ms(metadata: &std::fs::Metadata) -> Option<i64> {
        metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
    }
}

impl Default for TokioPlaylistStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaylistStorage for TokioPlaylistStorage {
    async fn has_read_write(&self, location: &str) -> Result<bool> {
        match fs::metadata(location).await {
            Ok(metadata) => Ok(metadata.is_dir() && !metadata.permissions().readonly()),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                Ok(false)
            }
            Err(e) => Err(Self::map_io_error(e)),
        }
    }

    async fn list_files(
        &self,
        location: &str,
        extensions: &[&str],
    ) -> Result<Vec<ExternalFileRecord>> {
        let mut records = Vec::new();
        let mut read_dir = fs::read_dir(location).await.map_err(Self::map_io_error)?;

        while let Some(entry) = read_dir.next_entry().await.map_err(Self::map_io_error)? {
            let metadata = entry.metadata().await.map_err(Self::map_io_error)?;
            if !metadata.is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                debug!(path = ?entry.path(), "Skipping file with non-UTF-8 name");
                continue;
            };

            let matches = name
                .rsplit_once('.')
                .map(|(_, ext)| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
                .unwrap_or(false);
            if !matches {
                continue;
            }

            records.push(ExternalFileRecord {
                relative_path: name.clone(),
                name,
                last_modified: Self::modified_ms(&metadata),
                uri: entry.path().to_string_lossy().into_owned(),
            });
        }

        debug!(location, count = records.len(), "Listed playlist files");
        Ok(records)
    }

    async fn read(&self, record: &ExternalFileRecord) -> Result<Bytes> {
        let data = fs::read(&record.uri).await.map_err(Self::map_io_error)?;
        debug!(uri = %record.uri, size = data.len(), "Read playlist file");
        Ok(Bytes::from(data))
    }

    async fn write(&self, record: &ExternalFileRecord, data: Bytes) -> Result<()> {
        fs::write(&record.uri, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(uri = %record.uri, size = data.len(), "Wrote playlist file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    async fn listed(storage: &TokioPlaylistStorage, location: &Path) -> Vec<ExternalFileRecord> {
        let mut records = storage
            .list_files(&location.to_string_lossy(), &["m3u", "m3u8"])
            .await
            .unwrap();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    #[tokio::test]
    async fn test_has_read_write_for_directory() {
        let dir = tempdir().unwrap();
        let storage = TokioPlaylistStorage::new();

        assert!(storage
            .has_read_write(&dir.path().to_string_lossy())
            .await
            .unwrap());
        assert!(!storage
            .has_read_write(&dir.path().join("absent").to_string_lossy())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_listing_filters_by_extension() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.m3u"), "x").unwrap();
        std::fs::write(dir.path().join("b.M3U8"), "x").unwrap();
        std::fs::write(dir.path().join("cover.jpg"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub.m3u")).unwrap();

        let storage = TokioPlaylistStorage::new();
        let records = listed(&storage, dir.path()).await;

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a.m3u", "b.M3U8"]);
        assert!(records.iter().all(|r| r.last_modified.is_some()));
    }

    #[tokio::test]
    async fn test_read_write_round_trip() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("mix.m3u"), "old").unwrap();

        let storage = TokioPlaylistStorage::new();
        let records = listed(&storage, dir.path()).await;
        let record = &records[0];

        storage
            .write(record, Bytes::from_static(b"/music/a.mp3"))
            .await
            .unwrap();
        let data = storage.read(record).await.unwrap();

        assert_eq!(&data[..], b"/music/a.mp3");
    }

    #[tokio::test]
    async fn test_write_refreshes_modification_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mix.m3u");
        std::fs::write(&path, "old").unwrap();
        // Push the mtime into the past so the rewrite is observable
        let stale = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(stale).unwrap();
        drop(file);

        let storage = TokioPlaylistStorage::new();
        let before = listed(&storage, dir.path()).await[0].last_modified.unwrap();

        storage
            .write(&listed(&storage, dir.path()).await[0], Bytes::from_static(b"new"))
            .await
            .unwrap();

        let after = listed(&storage, dir.path()).await[0].last_modified.unwrap();
        assert!(after > before);
    }
}
