//! Sync configuration
//!
//! Which storage location to sync against, which playlist maps to which file
//! name, and the import/export settings shared by every mapping. The
//! coordinator observes the configuration through a watch channel so the
//! settings UI can swap it live.

use core_playlist::{IoSettings, PlaylistId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A configured association between one playlist and one external file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMapping {
    pub playlist_id: PlaylistId,
    /// File name including extension, relative to the storage location root
    pub file_name: String,
}

/// Full playlist file sync configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Storage location identifier understood by the configured
    /// `PlaylistStorage`; `None` disables syncing entirely.
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub mappings: Vec<SyncMapping>,

    #[serde(default)]
    pub io: IoSettings,

    /// Charset name for decoding `.m3u` imports; `.m3u8` always implies
    /// UTF-8 regardless of this setting.
    #[serde(default)]
    pub charset: Option<String>,
}

impl SyncConfig {
    /// File names claimed by more than one mapping.
    ///
    /// The mapping set must be injective; any name returned here aborts the
    /// entire pass before per-mapping work starts.
    pub fn conflicting_file_names(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for mapping in &self.mappings {
            *counts.entry(mapping.file_name.as_str()).or_default() += 1;
        }

        let mut conflicts: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect();
        conflicts.sort();
        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_conflicts_for_distinct_names() {
        let config = SyncConfig {
            mappings: vec![
                SyncMapping {
                    playlist_id: PlaylistId::new(),
                    file_name: "a.m3u".to_string(),
                },
                SyncMapping {
                    playlist_id: PlaylistId::new(),
                    file_name: "b.m3u".to_string(),
                },
            ],
            ..SyncConfig::default()
        };

        assert!(config.conflicting_file_names().is_empty());
    }

    #[test]
    fn test_duplicate_file_names_are_reported_once() {
        let config = SyncConfig {
            mappings: vec![
                SyncMapping {
                    playlist_id: PlaylistId::new(),
                    file_name: "x.m3u".to_string(),
                },
                SyncMapping {
                    playlist_id: PlaylistId::new(),
                    file_name: "x.m3u".to_string(),
                },
                SyncMapping {
                    playlist_id: PlaylistId::new(),
                    file_name: "y.m3u".to_string(),
                },
            ],
            ..SyncConfig::default()
        };

        assert_eq!(config.conflicting_file_names(), vec!["x.m3u".to_string()]);
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let config: SyncConfig = serde_json::from_str("{}").expect("empty config parses");

        assert_eq!(config.location, None);
        assert!(config.mappings.is_empty());
        assert!(config.io.ignore_case);
        assert!(config.io.remove_invalid);
        assert_eq!(config.charset, None);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = SyncConfig {
            location: Some("/sdcard/Playlists".to_string()),
            mappings: vec![SyncMapping {
                playlist_id: PlaylistId::new(),
                file_name: "mix.m3u8".to_string(),
            }],
            charset: Some("ISO-8859-1".to_string()),
            ..SyncConfig::default()
        };

        let json = serde_json::to_string(&config).expect("serializes");
        let parsed: SyncConfig = serde_json::from_str(&json).expect("parses");
        assert_eq!(parsed, config);
    }
}
