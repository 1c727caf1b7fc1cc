//! # Playlist Management Module
//!
//! Owns the canonical in-memory playlist collection and the pure machinery
//! around it.
//!
//! ## Overview
//!
//! This module manages:
//! - The playlist data model and its derived, library-joined views
//! - The copy-on-write [`PlaylistStore`](store::PlaylistStore) with
//!   watch-based snapshots
//! - Fuzzy path matching against the library index
//! - Lenient M3U/M3U8 parsing and serialization
//! - Versioned binary snapshot encoding for persistence

pub mod error;
pub mod m3u;
pub mod matcher;
pub mod models;
pub mod persistence;
pub mod store;

pub use error::{PlaylistError, Result};
pub use m3u::{parse_m3u, to_m3u, IoSettings};
pub use matcher::{MatchSettings, PathIndex};
pub use models::{
    display_name, now_ms, EntryKey, LibraryIndex, Playlist, PlaylistEntry, PlaylistId,
    RealizedPlaylist, RealizedPlaylistEntry, SpecialPlaylist, Track,
};
pub use store::{PlaylistMap, PlaylistStore};
