//! # Desktop Bridge Implementations
//!
//! Desktop-ready implementations of the host bridge traits:
//! - [`TokioPlaylistStorage`](storage::TokioPlaylistStorage) - playlist file
//!   storage over a local directory using `tokio::fs`
//! - [`FileSnapshotStore`](snapshot::FileSnapshotStore) - snapshot
//!   persistence in the platform data directory with atomic replacement

pub mod snapshot;
pub mod storage;

pub use snapshot::FileSnapshotStore;
pub use storage::TokioPlaylistStorage;
