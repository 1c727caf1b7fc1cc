use thiserror::Error;

/// One sync pass accumulates these instead of aborting: the first three are
/// pass-wide preconditions that skip every mapping, the rest are attributed
/// to a single mapping and leave its siblings unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Storage location {location} has no persistable read/write permission")]
    PermissionDenied { location: String },

    #[error("Error listing files at the sync location: {0}")]
    ListingFailed(String),

    #[error("Conflicting file names in sync mappings: {file_names}")]
    MappingConflict { file_names: String },

    #[error("The playlist mapped to {file_name} does not exist")]
    PlaylistMissing { file_name: String },

    #[error("File {file_name} for playlist {playlist} is missing")]
    FileMissing { playlist: String, file_name: String },

    #[error("File {file_name} for playlist {playlist} has no modification time")]
    NoFileTimestamp { playlist: String, file_name: String },

    #[error("Import of {playlist} from {file_name} failed: {cause}")]
    ImportFailed {
        playlist: String,
        file_name: String,
        cause: String,
    },

    #[error("Export of {playlist} to {file_name} failed: {cause}")]
    ExportFailed {
        playlist: String,
        file_name: String,
        cause: String,
    },
}

impl SyncError {
    /// Pass-wide errors short-circuit the entire pass; per-mapping errors are
    /// isolated to their mapping.
    pub fn is_pass_wide(&self) -> bool {
        matches!(
            self,
            SyncError::PermissionDenied { .. }
                | SyncError::ListingFailed(_)
                | SyncError::MappingConflict { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
