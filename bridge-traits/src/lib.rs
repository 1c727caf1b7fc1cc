//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playlist core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per platform
//! (desktop directories, SAF document trees, cloud folders).
//!
//! ## Traits
//!
//! - [`PlaylistStorage`](storage::PlaylistStorage) - Listing and I/O against
//!   the user-chosen playlist file location
//! - [`SnapshotStore`](storage::SnapshotStore) - Durable persistence of the
//!   serialized playlist collection snapshot
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert platform-specific errors to
//! `BridgeError` and include context (paths, location identifiers).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod error;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use storage::{ExternalFileRecord, PlaylistStorage, SnapshotStore};
