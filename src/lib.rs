//! Workspace facade crate.
//!
//! Host applications can depend on `playlist-sync-workspace` and reach every
//! member crate through one dependency instead of wiring each individually.

pub use bridge_desktop;
pub use bridge_traits;
pub use core_playlist;
pub use core_runtime;
pub use core_sync;
