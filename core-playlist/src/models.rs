//! Domain models for the playlist collection
//!
//! This module contains the persisted playlist entities, the read-only
//! library index they are resolved against, and the derived realized views.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistId(pub Uuid);

impl PlaylistId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for PlaylistId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier for one entry within a playlist
///
/// Survives edits and reordering; selection and partial removal address
/// entries by key, never by path or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey(pub Uuid);

impl EntryKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EntryKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Special Playlists
// =============================================================================

/// Built-in playlists that cannot be deleted or renamed by the user.
///
/// Identified structurally by reserved ids; the stored `name` field of a
/// special playlist is ignored and its display name derives from the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialPlaylist {
    Favorites,
    ListenLater,
}

impl SpecialPlaylist {
    pub const ALL: &'static [SpecialPlaylist] =
        &[SpecialPlaylist::Favorites, SpecialPlaylist::ListenLater];

    /// Reserved id for this playlist. Version 8 UUIDs, guaranteed to never
    /// collide with `Uuid::new_v4` output.
    pub const fn id(self) -> PlaylistId {
        match self {
            // 00000000-0000-8000-8000-000000000000
            SpecialPlaylist::Favorites => {
                PlaylistId(Uuid::from_u128(0x0000_0000_0000_8000_8000_0000_0000_0000))
            }
            // 00000000-0000-8000-8000-000000000001
            SpecialPlaylist::ListenLater => {
                PlaylistId(Uuid::from_u128(0x0000_0000_0000_8000_8000_0000_0000_0001))
            }
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            SpecialPlaylist::Favorites => "Favorites",
            SpecialPlaylist::ListenLater => "Listen later",
        }
    }

    /// Rank used when sorting special playlists ahead of user playlists.
    pub const fn order(self) -> u32 {
        match self {
            SpecialPlaylist::Favorites => 0,
            SpecialPlaylist::ListenLater => 1,
        }
    }

    /// Structural lookup by reserved id.
    pub fn of(id: PlaylistId) -> Option<Self> {
        Self::ALL.iter().copied().find(|special| special.id() == id)
    }
}

// =============================================================================
// Persisted Entities
// =============================================================================

/// One path entry in a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub key: EntryKey,
    pub path: String,
}

/// A user playlist.
///
/// Changes to this type must not change the meaning of existing fields, and
/// every field added after v1 must carry a serde default, or the user will
/// have their playlists wiped after an app update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<PlaylistEntry>,
    /// Milliseconds since epoch
    #[serde(default)]
    pub last_modified: i64,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            last_modified: 0,
        }
    }

    pub fn with_last_modified(mut self, last_modified: i64) -> Self {
        self.last_modified = last_modified;
        self
    }

    /// Append one entry per path, each with a freshly generated key.
    ///
    /// Keys are collision-checked against both the existing entries and keys
    /// generated earlier in the same call.
    pub fn add_paths<I>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let existing: HashSet<EntryKey> = self.entries.iter().map(|entry| entry.key).collect();
        let mut minted: HashSet<EntryKey> = HashSet::new();
        let mut entries = self.entries.clone();

        for path in paths {
            let mut key = EntryKey::new();
            while existing.contains(&key) || minted.contains(&key) {
                key = EntryKey::new();
            }
            minted.insert(key);
            entries.push(PlaylistEntry { key, path });
        }

        Self {
            name: self.name.clone(),
            entries,
            last_modified: self.last_modified,
        }
    }

    pub fn add_tracks(&self, tracks: &[Track]) -> Self {
        self.add_paths(tracks.iter().map(|track| track.path.clone()))
    }

    /// Join this playlist against a library index snapshot.
    pub fn realize(&self, special: Option<SpecialPlaylist>, index: &LibraryIndex) -> RealizedPlaylist {
        RealizedPlaylist {
            special,
            custom_name: self.name.clone(),
            entries: self
                .entries
                .iter()
                .enumerate()
                .map(|(position, entry)| RealizedPlaylistEntry {
                    key: entry.key,
                    index: position,
                    track: index.resolve(&entry.path).cloned(),
                    entry: entry.clone(),
                })
                .collect(),
            last_modified: self.last_modified,
        }
    }
}

/// Display name for a playlist, honoring special playlist titles.
pub fn display_name(id: PlaylistId, playlist: &Playlist) -> String {
    match SpecialPlaylist::of(id) {
        Some(special) => special.title().to_string(),
        None => playlist.name.clone(),
    }
}

// =============================================================================
// Library Index
// =============================================================================

/// Read-only track metadata from the library scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
}

impl Track {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            artist: None,
            album: None,
            duration_ms: None,
        }
    }
}

/// Path → track snapshot of the media library.
///
/// Built elsewhere; this core only consumes it, and recomputes derived views
/// whenever a new snapshot is observed.
#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    pub tracks: HashMap<String, Track>,
}

impl LibraryIndex {
    pub fn from_tracks<I>(tracks: I) -> Self
    where
        I: IntoIterator<Item = Track>,
    {
        Self {
            tracks: tracks
                .into_iter()
                .map(|track| (track.path.clone(), track))
                .collect(),
        }
    }

    pub fn resolve(&self, path: &str) -> Option<&Track> {
        self.tracks.get(path)
    }

    pub fn path_set(&self) -> HashSet<String> {
        self.tracks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

// =============================================================================
// Realized Views
// =============================================================================

/// One playlist entry joined against the library index.
///
/// `track` is `None` when the stored path is not currently in the library;
/// such entries still count toward length but are flagged invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizedPlaylistEntry {
    pub key: EntryKey,
    pub index: usize,
    pub track: Option<Track>,
    pub entry: PlaylistEntry,
}

/// Derived, read-only view of a playlist. Recomputed whenever the playlist
/// map or the library index changes; never a source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealizedPlaylist {
    pub special: Option<SpecialPlaylist>,
    pub custom_name: String,
    pub entries: Vec<RealizedPlaylistEntry>,
    pub last_modified: i64,
}

impl RealizedPlaylist {
    pub fn display_name(&self) -> &str {
        match self.special {
            Some(special) => special.title(),
            None => &self.custom_name,
        }
    }

    pub fn valid_tracks(&self) -> impl Iterator<Item = &Track> {
        self.entries.iter().filter_map(|entry| entry.track.as_ref())
    }

    pub fn invalid_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.track.is_none())
            .count()
    }
}

/// Current wall clock in milliseconds since epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_ids_are_stable_and_reserved() {
        let favorites = SpecialPlaylist::Favorites.id();
        assert_eq!(favorites.to_string(), "00000000-0000-8000-8000-000000000000");
        assert_eq!(SpecialPlaylist::of(favorites), Some(SpecialPlaylist::Favorites));

        let listen_later = SpecialPlaylist::ListenLater.id();
        assert_eq!(listen_later.to_string(), "00000000-0000-8000-8000-000000000001");
        assert_eq!(
            SpecialPlaylist::of(listen_later),
            Some(SpecialPlaylist::ListenLater)
        );

        assert_eq!(SpecialPlaylist::of(PlaylistId::new()), None);
    }

    #[test]
    fn test_add_paths_generates_unique_keys() {
        let mut playlist = Playlist::new("mix");
        for _ in 0..4 {
            playlist = playlist.add_paths((0..64).map(|i| format!("/music/{i}.mp3")));
        }

        let keys: HashSet<EntryKey> = playlist.entries.iter().map(|e| e.key).collect();
        assert_eq!(playlist.entries.len(), 256);
        assert_eq!(keys.len(), 256);
    }

    #[test]
    fn test_add_paths_preserves_order_and_metadata() {
        let playlist = Playlist::new("mix")
            .with_last_modified(42)
            .add_paths(["/a.mp3".to_string(), "/b.mp3".to_string()]);

        assert_eq!(playlist.last_modified, 42);
        let paths: Vec<&str> = playlist.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/a.mp3", "/b.mp3"]);
    }

    #[test]
    fn test_realize_flags_missing_tracks() {
        let index = LibraryIndex::from_tracks([Track::new("/a.mp3", "A")]);
        let playlist = Playlist::new("mix").add_paths(["/a.mp3".to_string(), "/gone.mp3".to_string()]);

        let realized = playlist.realize(None, &index);
        assert_eq!(realized.entries.len(), 2);
        assert_eq!(realized.valid_tracks().count(), 1);
        assert_eq!(realized.invalid_count(), 1);
        assert_eq!(realized.entries[1].index, 1);
        assert!(realized.entries[1].track.is_none());
    }

    #[test]
    fn test_display_name_ignores_stored_name_for_specials() {
        let stored = Playlist::new("should not show");
        assert_eq!(display_name(SpecialPlaylist::Favorites.id(), &stored), "Favorites");

        let id = PlaylistId::new();
        assert_eq!(display_name(id, &stored), "should not show");
    }

    #[test]
    fn test_realized_display_name() {
        let index = LibraryIndex::default();
        let playlist = Playlist::new("ignored");
        let realized = playlist.realize(Some(SpecialPlaylist::Favorites), &index);
        assert_eq!(realized.display_name(), "Favorites");
    }
}
