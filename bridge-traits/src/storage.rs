//! Storage Abstractions
//!
//! Provides platform-agnostic traits for playlist file storage and snapshot
//! persistence.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One playlist file found at a configured storage location.
///
/// `uri` is an opaque handle understood only by the storage implementation
/// that produced the record; callers pass it back unchanged to `read`/`write`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFileRecord {
    /// File name including extension (e.g. `road trip.m3u8`)
    pub name: String,
    /// Path relative to the storage location root
    pub relative_path: String,
    /// Last modification time in milliseconds since epoch, if the backing
    /// storage exposes one
    pub last_modified: Option<i64>,
    /// Opaque handle for subsequent read/write calls
    pub uri: String,
}

impl ExternalFileRecord {
    /// File name without its extension.
    pub fn base_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(dot) if dot > 0 => &self.name[..dot],
            _ => &self.name,
        }
    }

    /// Whether the file name carries the given extension, compared
    /// case-insensitively.
    pub fn has_extension(&self, extension: &str) -> bool {
        self.name
            .rfind('.')
            .map(|dot| self.name[dot + 1..].eq_ignore_ascii_case(extension))
            .unwrap_or(false)
    }
}

/// Playlist file storage trait
///
/// Abstracts listing and I/O against a user-chosen storage location:
/// - Desktop: a local directory
/// - Android: a SAF document tree
/// - Cloud: a provider folder
///
/// Listings are shallow; a location holds playlist files directly.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::PlaylistStorage;
///
/// async fn newest(storage: &dyn PlaylistStorage, location: &str) -> Option<String> {
///     let files = storage.list_files(location, &["m3u", "m3u8"]).await.ok()?;
///     files
///         .into_iter()
///         .max_by_key(|f| f.last_modified)
///         .map(|f| f.name)
/// }
/// ```
#[async_trait]
pub trait PlaylistStorage: Send + Sync {
    /// Check that the location is both readable and writable.
    ///
    /// Returns `Ok(false)` when the location exists but access is not
    /// authorized; errors are reserved for probe failures.
    async fn has_read_write(&self, location: &str) -> Result<bool>;

    /// List files at the location whose extension matches one of
    /// `extensions` (compared case-insensitively, without the dot).
    async fn list_files(
        &self,
        location: &str,
        extensions: &[&str],
    ) -> Result<Vec<ExternalFileRecord>>;

    /// Read the full contents of a previously listed file.
    async fn read(&self, record: &ExternalFileRecord) -> Result<Bytes>;

    /// Overwrite the contents of a previously listed file.
    ///
    /// Implementations are not required to preserve or set any particular
    /// modification time; callers re-list to observe the new timestamp.
    async fn write(&self, record: &ExternalFileRecord, data: Bytes) -> Result<()>;
}

/// Snapshot persistence trait
///
/// Durably stores one opaque serialized snapshot of the playlist collection.
/// The encoding is owned by the caller; implementations only move bytes.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, or `Ok(None)` when nothing has been
    /// saved yet.
    async fn load(&self) -> Result<Option<Bytes>>;

    /// Replace the saved snapshot. Must be atomic: a crash mid-save leaves
    /// either the old or the new snapshot, never a torn one.
    async fn save(&self, data: Bytes) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_extension() {
        let record = ExternalFileRecord {
            name: "road trip.m3u8".to_string(),
            relative_path: "road trip.m3u8".to_string(),
            last_modified: Some(1_700_000_000_000),
            uri: "/music/road trip.m3u8".to_string(),
        };

        assert_eq!(record.base_name(), "road trip");
    }

    #[test]
    fn test_base_name_without_extension() {
        let record = ExternalFileRecord {
            name: "playlist".to_string(),
            relative_path: "playlist".to_string(),
            last_modified: None,
            uri: "/music/playlist".to_string(),
        };

        assert_eq!(record.base_name(), "playlist");
    }

    #[test]
    fn test_has_extension_is_case_insensitive() {
        let record = ExternalFileRecord {
            name: "Mix.M3U".to_string(),
            relative_path: "Mix.M3U".to_string(),
            last_modified: None,
            uri: "/music/Mix.M3U".to_string(),
        };

        assert!(record.has_extension("m3u"));
        assert!(!record.has_extension("m3u8"));
    }
}
