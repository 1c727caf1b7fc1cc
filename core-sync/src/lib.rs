//! # Playlist File Synchronization Module
//!
//! Keeps the in-memory playlist collection consistent with `.m3u`/`.m3u8`
//! files at a user-chosen storage location.
//!
//! ## Overview
//!
//! This module manages:
//! - Per-playlist file mappings and import/export settings (`config`)
//! - The debounced, mutually-exclusive sync pass loop (`coordinator`)
//! - The sync error taxonomy and pass reporting (`error`)
//!
//! ## Components
//!
//! - **Sync Configuration** (`config`): storage location, injective
//!   playlist-to-file mappings, I/O settings, charset
//! - **Sync Coordinator** (`coordinator`): single-flight pass execution with
//!   a pending-flag drain loop, per-mapping error isolation, and a published
//!   human-readable pass log

pub mod config;
pub mod coordinator;
pub mod error;

pub use config::{SyncConfig, SyncMapping};
pub use coordinator::{PassReport, SyncCoordinator};
pub use error::{Result, SyncError};

/// File extensions (without the dot) recognized as playlist files.
pub const PLAYLIST_EXTENSIONS: &[&str] = &["m3u", "m3u8"];
