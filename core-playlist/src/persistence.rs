//! Snapshot encoding for the playlist collection
//!
//! The collection persists as one compact bincode blob: a versioned envelope
//! holding the playlist map keyed by canonical UUID text. bincode carries no
//! field names, so compatibility rests on the explicit version tag: a
//! mismatched version surfaces as a typed error and the caller decides
//! whether to migrate or reseed. Within one version, new `Playlist` fields
//! must carry serde defaults.

use crate::error::{PlaylistError, Result};
use crate::models::{Playlist, PlaylistId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bump when the envelope layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotEnvelope {
    version: u32,
    playlists: HashMap<String, Playlist>,
}

/// Encode the playlist map into snapshot bytes.
pub fn encode_snapshot(playlists: &HashMap<PlaylistId, Playlist>) -> Result<Vec<u8>> {
    let envelope = SnapshotEnvelope {
        version: SNAPSHOT_VERSION,
        playlists: playlists
            .iter()
            .map(|(id, playlist)| (id.to_string(), playlist.clone()))
            .collect(),
    };
    Ok(bincode::serialize(&envelope)?)
}

/// Decode snapshot bytes back into the playlist map.
pub fn decode_snapshot(bytes: &[u8]) -> Result<HashMap<PlaylistId, Playlist>> {
    let envelope: SnapshotEnvelope = bincode::deserialize(bytes)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(PlaylistError::SnapshotVersion(envelope.version));
    }

    envelope
        .playlists
        .into_iter()
        .map(|(id, playlist)| Ok((PlaylistId::from_string(&id)?, playlist)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpecialPlaylist;

    #[test]
    fn test_snapshot_round_trip() {
        let mut playlists = HashMap::new();
        playlists.insert(
            SpecialPlaylist::Favorites.id(),
            Playlist::new("").add_paths(["/music/a.mp3".to_string()]),
        );
        playlists.insert(
            PlaylistId::new(),
            Playlist::new("mix")
                .with_last_modified(12345)
                .add_paths(["/music/b.mp3".to_string(), "/music/c.mp3".to_string()]),
        );

        let bytes = encode_snapshot(&playlists).unwrap();
        let decoded = decode_snapshot(&bytes).unwrap();

        assert_eq!(decoded, playlists);
    }

    #[test]
    fn test_version_mismatch_is_typed() {
        let envelope = SnapshotEnvelope {
            version: SNAPSHOT_VERSION + 1,
            playlists: HashMap::new(),
        };
        let bytes = bincode::serialize(&envelope).unwrap();

        match decode_snapshot(&bytes) {
            Err(PlaylistError::SnapshotVersion(version)) => {
                assert_eq!(version, SNAPSHOT_VERSION + 1)
            }
            other => panic!("expected version mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_garbage_is_a_codec_error() {
        assert!(matches!(
            decode_snapshot(&[0xff; 3]),
            Err(PlaylistError::SnapshotCodec(_))
        ));
    }
}
