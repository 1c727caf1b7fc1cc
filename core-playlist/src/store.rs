//! Copy-on-write playlist store
//!
//! The store owns the authoritative in-memory playlist map behind a
//! `tokio::sync::watch` channel. Every mutation clones the current map,
//! applies the change, and swaps in a fresh `Arc`, so readers always observe
//! a fully-formed snapshot and never a partial update; conflicting writers
//! resolve last-write-wins per key.
//!
//! Mutations that should wake the background synchronization loop set the
//! shared sync-pending flag; programmatic writes performed by the sync pass
//! itself pass `mark_pending = false` to avoid self-triggering feedback.

use crate::error::Result;
use crate::models::{
    now_ms, LibraryIndex, Playlist, PlaylistId, RealizedPlaylist, SpecialPlaylist, Track,
};
use crate::persistence::{decode_snapshot, encode_snapshot};
use bridge_traits::storage::SnapshotStore;
use bytes::Bytes;
use core_runtime::events::{CoreEvent, EventBus, PlaylistEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One immutable snapshot of the whole collection.
pub type PlaylistMap = Arc<HashMap<PlaylistId, Playlist>>;

pub struct PlaylistStore {
    playlists: watch::Sender<PlaylistMap>,
    sync_pending: AtomicBool,
    event_bus: EventBus,
}

impl PlaylistStore {
    /// Create a store seeded with the one special Favorites playlist.
    pub fn new(event_bus: EventBus) -> Self {
        Self::from_map(HashMap::new(), event_bus)
    }

    /// Create a store from a loaded playlist map; an empty map is seeded
    /// with the Favorites playlist instead.
    pub fn from_map(mut playlists: HashMap<PlaylistId, Playlist>, event_bus: EventBus) -> Self {
        if playlists.is_empty() {
            playlists.insert(SpecialPlaylist::Favorites.id(), Playlist::new(""));
        }
        let (sender, _) = watch::channel(Arc::new(playlists));
        Self {
            playlists: sender,
            sync_pending: AtomicBool::new(false),
            event_bus,
        }
    }

    /// Load the persisted snapshot, falling back to a seeded store when
    /// nothing usable is found. An unreadable snapshot is discarded rather
    /// than failing startup.
    pub async fn load(snapshot_store: &dyn SnapshotStore, event_bus: EventBus) -> Self {
        let playlists = match snapshot_store.load().await {
            Ok(Some(bytes)) => match decode_snapshot(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!("Discarding unreadable playlist snapshot: {}", e);
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!("Failed to load playlist snapshot: {}", e);
                HashMap::new()
            }
        };
        Self::from_map(playlists, event_bus)
    }

    /// Persist the current snapshot.
    pub async fn persist(&self, snapshot_store: &dyn SnapshotStore) -> Result<()> {
        let bytes = encode_snapshot(&self.snapshot())?;
        snapshot_store.save(Bytes::from(bytes)).await?;
        debug!("Saved playlist snapshot");
        Ok(())
    }

    /// Spawn the debounced autosave task: every store change schedules a save
    /// of the then-current snapshot after `debounce`. Returns the token that
    /// stops the task.
    pub fn spawn_autosave(
        self: Arc<Self>,
        snapshot_store: Arc<dyn SnapshotStore>,
        debounce: Duration,
    ) -> CancellationToken {
        let token = CancellationToken::new();
        let guard = token.clone();
        let store = self;

        tokio::spawn(async move {
            let mut changes = store.subscribe();
            loop {
                tokio::select! {
                    _ = guard.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        tokio::time::sleep(debounce).await;
                        // Absorb every change that arrived while waiting
                        let _ = changes.borrow_and_update();
                        if let Err(e) = store.persist(snapshot_store.as_ref()).await {
                            warn!("Failed to save playlist snapshot: {}", e);
                        }
                    }
                }
            }
        });

        token
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Insert a playlist under a fresh random id, retrying generation until
    /// no collision exists. Marks sync-pending.
    pub fn create(&self, playlist: Playlist) -> PlaylistId {
        self.sync_pending.store(true, Ordering::SeqCst);
        loop {
            let id = PlaylistId::new();
            let mut inserted = false;
            self.playlists.send_modify(|map| {
                if !map.contains_key(&id) {
                    let mut next = (**map).clone();
                    next.insert(id, playlist.clone());
                    *map = Arc::new(next);
                    inserted = true;
                }
            });
            if inserted {
                self.event_bus
                    .emit(CoreEvent::Playlist(PlaylistEvent::Created {
                        playlist_id: id.to_string(),
                        name: playlist.name.clone(),
                    }))
                    .ok();
                return id;
            }
        }
    }

    /// Upsert: replace an existing playlist with
    /// `transform(current).with_last_modified(last_modified ?? now)`, or
    /// insert `transform(empty)` when `id` is absent (callers may target a
    /// not-yet-created id; the transform then owns the timestamp).
    ///
    /// `mark_pending` controls whether this write wakes the sync loop.
    pub fn update<F>(&self, id: PlaylistId, last_modified: Option<i64>, mark_pending: bool, transform: F)
    where
        F: FnOnce(&Playlist) -> Playlist,
    {
        if mark_pending {
            self.sync_pending.store(true, Ordering::SeqCst);
        }
        self.playlists.send_modify(|map| {
            let mut next = (**map).clone();
            match next.get(&id) {
                Some(current) => {
                    let updated = transform(current)
                        .with_last_modified(last_modified.unwrap_or_else(now_ms));
                    next.insert(id, updated);
                }
                None => {
                    next.insert(id, transform(&Playlist::default()));
                }
            }
            *map = Arc::new(next);
        });
        self.event_bus
            .emit(CoreEvent::Playlist(PlaylistEvent::Updated {
                playlist_id: id.to_string(),
            }))
            .ok();
    }

    /// Remove a playlist unconditionally. Marks sync-pending.
    pub fn remove(&self, id: PlaylistId) {
        self.sync_pending.store(true, Ordering::SeqCst);
        self.playlists.send_modify(|map| {
            let mut next = (**map).clone();
            next.remove(&id);
            *map = Arc::new(next);
        });
        self.event_bus
            .emit(CoreEvent::Playlist(PlaylistEvent::Removed {
                playlist_id: id.to_string(),
            }))
            .ok();
    }

    /// Add the track to Favorites if absent, else remove every entry with its
    /// path.
    pub fn toggle_favorite(&self, track: &Track) {
        let path = track.path.clone();
        self.update(SpecialPlaylist::Favorites.id(), None, true, move |playlist| {
            if playlist.entries.iter().any(|entry| entry.path == path) {
                let mut next = playlist.clone();
                next.entries.retain(|entry| entry.path != path);
                next
            } else {
                playlist.add_paths([path])
            }
        });
    }

    // -------------------------------------------------------------------------
    // Reading
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> PlaylistMap {
        self.playlists.borrow().clone()
    }

    pub fn get(&self, id: PlaylistId) -> Option<Playlist> {
        self.playlists.borrow().get(&id).cloned()
    }

    /// Current snapshot plus "subscribe to next change".
    pub fn subscribe(&self) -> watch::Receiver<PlaylistMap> {
        self.playlists.subscribe()
    }

    /// Join the whole collection against a library index snapshot.
    pub fn realized(&self, index: &LibraryIndex) -> HashMap<PlaylistId, RealizedPlaylist> {
        self.snapshot()
            .iter()
            .map(|(id, playlist)| (*id, playlist.realize(SpecialPlaylist::of(*id), index)))
            .collect()
    }

    pub fn is_favorite(&self, track: &Track) -> bool {
        self.get(SpecialPlaylist::Favorites.id())
            .map(|playlist| playlist.entries.iter().any(|entry| entry.path == track.path))
            .unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // Sync-pending flag
    // -------------------------------------------------------------------------

    pub fn mark_sync_pending(&self) {
        self.sync_pending.store(true, Ordering::SeqCst);
    }

    /// Read and clear the pending flag in one step; the sync drain loop calls
    /// this before each pass.
    pub fn take_sync_pending(&self) -> bool {
        self.sync_pending.swap(false, Ordering::SeqCst)
    }

    pub fn sync_pending(&self) -> bool {
        self.sync_pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use tokio::sync::Mutex as AsyncMutex;

    fn store() -> PlaylistStore {
        PlaylistStore::new(EventBus::new(16))
    }

    #[tokio::test]
    async fn test_seeds_favorites_when_empty() {
        let store = store();
        let snapshot = store.snapshot();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&SpecialPlaylist::Favorites.id()));
    }

    #[tokio::test]
    async fn test_loaded_map_is_not_reseeded() {
        let mut map = HashMap::new();
        let id = PlaylistId::new();
        map.insert(id, Playlist::new("mix"));

        let store = PlaylistStore::from_map(map, EventBus::new(16));
        let snapshot = store.snapshot();

        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains_key(&SpecialPlaylist::Favorites.id()));
        assert!(snapshot.contains_key(&id));
    }

    #[tokio::test]
    async fn test_create_marks_pending_and_stores() {
        let store = store();
        let id = store.create(Playlist::new("mix"));

        assert!(store.sync_pending());
        assert_eq!(store.get(id).map(|p| p.name), Some("mix".to_string()));
    }

    #[tokio::test]
    async fn test_update_applies_transform_and_timestamp() {
        let store = store();
        let id = store.create(Playlist::new("mix"));
        store.take_sync_pending();

        store.update(id, Some(777), false, |playlist| {
            playlist.add_paths(["/a.mp3".to_string()])
        });

        let playlist = store.get(id).expect("playlist exists");
        assert_eq!(playlist.entries.len(), 1);
        assert_eq!(playlist.last_modified, 777);
        // Non-pending write must not wake the sync loop
        assert!(!store.sync_pending());
    }

    #[tokio::test]
    async fn test_update_defaults_to_now() {
        let store = store();
        let id = store.create(Playlist::new("mix"));

        let before = now_ms();
        store.update(id, None, true, |playlist| playlist.clone());
        let after = now_ms();

        let stamped = store.get(id).expect("playlist exists").last_modified;
        assert!((before..=after).contains(&stamped));
    }

    #[tokio::test]
    async fn test_update_upserts_absent_id() {
        let store = store();
        let id = PlaylistId::new();

        store.update(id, Some(999), true, |empty| {
            assert!(empty.entries.is_empty());
            Playlist::new("imported").with_last_modified(123)
        });

        // The insert path keeps the transform's own timestamp
        assert_eq!(store.get(id).map(|p| p.last_modified), Some(123));
    }

    #[tokio::test]
    async fn test_remove_deletes_and_marks_pending() {
        let store = store();
        let id = store.create(Playlist::new("mix"));
        store.take_sync_pending();

        store.remove(id);

        assert!(store.get(id).is_none());
        assert!(store.sync_pending());
    }

    #[tokio::test]
    async fn test_toggle_favorite_round_trip() {
        let store = store();
        let track = Track::new("/music/a.mp3", "A");

        store.toggle_favorite(&track);
        assert!(store.is_favorite(&track));

        store.toggle_favorite(&track);
        assert!(!store.is_favorite(&track));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = store();
        let mut rx = store.subscribe();

        store.create(Playlist::new("mix"));

        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_creates_never_tear() {
        let store = Arc::new(store());

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.create(Playlist::new(format!("p{i}")));
            }));
        }
        for handle in handles {
            handle.await.expect("task completes");
        }

        // 32 creates + seeded Favorites, all retained
        assert_eq!(store.snapshot().len(), 33);
    }

    #[tokio::test]
    async fn test_create_emits_event() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();
        let store = PlaylistStore::new(bus);

        let id = store.create(Playlist::new("mix"));

        match sub.recv().await.expect("event delivered") {
            CoreEvent::Playlist(PlaylistEvent::Created { playlist_id, name }) => {
                assert_eq!(playlist_id, id.to_string());
                assert_eq!(name, "mix");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    struct MemorySnapshotStore {
        data: AsyncMutex<Option<Bytes>>,
    }

    #[async_trait]
    impl SnapshotStore for MemorySnapshotStore {
        async fn load(&self) -> BridgeResult<Option<Bytes>> {
            Ok(self.data.lock().await.clone())
        }

        async fn save(&self, data: Bytes) -> BridgeResult<()> {
            *self.data.lock().await = Some(data);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_persist_and_load_round_trip() {
        let snapshots = MemorySnapshotStore {
            data: AsyncMutex::new(None),
        };

        let store = store();
        let id = store.create(Playlist::new("mix").add_paths(["/a.mp3".to_string()]));
        store.persist(&snapshots).await.expect("save succeeds");

        let reloaded = PlaylistStore::load(&snapshots, EventBus::new(16)).await;
        assert_eq!(reloaded.snapshot().len(), 2);
        assert_eq!(reloaded.get(id).map(|p| p.name), Some("mix".to_string()));
    }

    #[tokio::test]
    async fn test_load_falls_back_on_garbage_snapshot() {
        let snapshots = MemorySnapshotStore {
            data: AsyncMutex::new(Some(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))),
        };

        let store = PlaylistStore::load(&snapshots, EventBus::new(16)).await;
        assert!(store.snapshot().contains_key(&SpecialPlaylist::Favorites.id()));
    }

    #[tokio::test]
    async fn test_autosave_persists_after_debounce() {
        let snapshots = Arc::new(MemorySnapshotStore {
            data: AsyncMutex::new(None),
        });

        let store = Arc::new(store());
        let token = Arc::clone(&store).spawn_autosave(snapshots.clone(), Duration::from_millis(10));

        store.create(Playlist::new("mix"));

        let mut saved = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if snapshots.data.lock().await.is_some() {
                saved = true;
                break;
            }
        }
        token.cancel();
        assert!(saved, "autosave task never persisted the snapshot");
    }
}
