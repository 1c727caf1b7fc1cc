use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Snapshot codec error: {0}")]
    SnapshotCodec(#[from] bincode::Error),

    #[error("Snapshot version mismatch: {0}")]
    SnapshotVersion(u32),

    #[error("Invalid playlist id: {0}")]
    InvalidId(#[from] uuid::Error),
}

pub type Result<T> = std::result::Result<T, PlaylistError>;
