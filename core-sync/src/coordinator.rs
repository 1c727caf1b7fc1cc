//! # Sync Coordinator
//!
//! Drives bidirectional synchronization between the in-memory playlist
//! collection and `.m3u`/`.m3u8` files at a user-chosen storage location.
//!
//! ## Overview
//!
//! The `SyncCoordinator` is the only writer that touches both sides. Per
//! configured mapping it compares the playlist's `last_modified` against the
//! file's modification time and copies in one direction:
//! - file newer → parse the file and replace the playlist (import)
//! - playlist newer → serialize and overwrite the file (export)
//! - equal → nothing to do
//!
//! There is no merge; conflicts resolve by timestamp alone.
//!
//! ## Trigger model
//!
//! Store mutations set a shared pending flag; a long-lived observer task
//! watches the store and drains the flag whenever it is set. Draining means:
//! try-acquire the exclusivity lock without blocking, and while the pending
//! flag keeps getting set, run passes back to back. A caller whose
//! `try_lock` fails is already covered: the lock holder re-checks the flag
//! before releasing, so no request is ever dropped and no two passes ever
//! overlap.
//!
//! ## Failure model
//!
//! Pass-wide preconditions (storage permission, file listing, injective
//! mapping set) abort the whole pass. Everything else is isolated per
//! mapping: an unreadable file or a failed write is recorded and the
//! remaining mappings still run. Each pass publishes a timestamped
//! human-readable log, and a pass with any error emits exactly one
//! [`SyncEvent::Failed`] for the UI to surface.

use crate::config::{SyncConfig, SyncMapping};
use crate::error::SyncError;
use crate::PLAYLIST_EXTENSIONS;
use bridge_traits::storage::{ExternalFileRecord, PlaylistStorage};
use bytes::Bytes;
use chrono::Utc;
use core_playlist::{
    display_name, parse_m3u, to_m3u, LibraryIndex, Playlist, PlaylistId, PlaylistMap,
    PlaylistStore, SpecialPlaylist,
};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Outcome of one sync pass.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Human-readable log, one line per event or error
    pub log: String,
    /// Every error recorded during the pass
    pub errors: Vec<SyncError>,
    pub imported: u64,
    pub exported: u64,
    pub up_to_date: u64,
    /// True when no storage location is configured and the pass did nothing
    pub skipped: bool,
}

impl PassReport {
    fn line(&mut self, line: impl AsRef<str>) {
        self.log.push_str(line.as_ref());
        self.log.push('\n');
    }

    fn record(&mut self, err: SyncError) {
        self.line(err.to_string());
        self.errors.push(err);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Coordinates playlist file synchronization passes.
///
/// All runtime state is shared: background tasks work on a
/// [`clone_for_task`](Self::clone_for_task) copy whose lock, log channel and
/// cancellation token alias the originals.
pub struct SyncCoordinator {
    store: Arc<PlaylistStore>,
    storage: Arc<dyn PlaylistStorage>,
    library: watch::Receiver<Arc<LibraryIndex>>,
    config: watch::Receiver<SyncConfig>,
    event_bus: EventBus,

    /// At most one pass executes at a time; acquired with `try_lock` only,
    /// so callers never stall behind a running pass.
    sync_lock: Arc<Mutex<()>>,
    sync_log: Arc<watch::Sender<Option<String>>>,
    cancel: CancellationToken,
    observer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<PlaylistStore>,
        storage: Arc<dyn PlaylistStorage>,
        library: watch::Receiver<Arc<LibraryIndex>>,
        config: watch::Receiver<SyncConfig>,
        event_bus: EventBus,
    ) -> Self {
        let (sync_log, _) = watch::channel(None);
        Self {
            store,
            storage,
            library,
            config,
            event_bus,
            sync_lock: Arc::new(Mutex::new(())),
            sync_log: Arc::new(sync_log),
            cancel: CancellationToken::new(),
            observer: Arc::new(Mutex::new(None)),
        }
    }

    /// Clone for background task (avoids `Arc<Arc<...>>`).
    fn clone_for_task(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            storage: Arc::clone(&self.storage),
            library: self.library.clone(),
            config: self.config.clone(),
            event_bus: self.event_bus.clone(),
            sync_lock: Arc::clone(&self.sync_lock),
            sync_log: Arc::clone(&self.sync_log),
            cancel: self.cancel.clone(),
            observer: Arc::clone(&self.observer),
        }
    }

    /// Spawn the long-lived observer: every store change that left the
    /// pending flag set gets a drain attempt on the background runtime, so
    /// file I/O never runs on the mutating caller's task.
    pub async fn start(&self) {
        let this = self.clone_for_task();
        let handle = tokio::spawn(async move {
            let mut changes = this.store.subscribe();
            loop {
                tokio::select! {
                    _ = this.cancel.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if this.store.sync_pending() {
                            this.drain().await;
                        }
                    }
                }
            }
        });
        *self.observer.lock().await = Some(handle);
    }

    /// Request a sync pass.
    ///
    /// Always marks the pending flag, then attempts a non-blocking drain on
    /// a background task. When another pass is already running the request
    /// is still satisfied: the running pass re-checks the flag before
    /// releasing the lock.
    pub fn request_sync(&self) {
        self.store.mark_sync_pending();
        let this = self.clone_for_task();
        tokio::spawn(async move {
            this.drain().await;
        });
    }

    /// Latest published pass log.
    pub fn sync_log(&self) -> watch::Receiver<Option<String>> {
        self.sync_log.subscribe()
    }

    /// Stop the observer task. An in-flight pass runs to completion or fails
    /// naturally through its storage I/O.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.observer.lock().await.take() {
            let _ = handle.await;
        }
    }

    async fn drain(&self) {
        let Ok(_guard) = self.sync_lock.try_lock() else {
            // The lock holder re-checks the pending flag before releasing,
            // so this request is covered by the running pass or its
            // successor.
            return;
        };
        while self.store.take_sync_pending() {
            self.run_pass().await;
        }
    }

    /// Execute one full pass over all configured mappings.
    ///
    /// Exposed for deterministic testing; production triggers go through
    /// [`request_sync`](Self::request_sync) and the observer so passes stay
    /// mutually exclusive.
    #[instrument(skip(self))]
    pub async fn run_pass(&self) -> PassReport {
        let config = self.config.borrow().clone();
        let mut report = PassReport::default();

        let Some(location) = config.location.clone() else {
            report.skipped = true;
            return report;
        };

        let index = self.library.borrow().clone();
        let playlists = self.store.snapshot();

        self.event_bus.emit(CoreEvent::Sync(SyncEvent::Started)).ok();
        report.line(Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string());

        // Pass-wide preconditions; every failure is logged before deciding.
        match self.storage.has_read_write(&location).await {
            Ok(true) => {}
            Ok(false) => report.record(SyncError::PermissionDenied {
                location: location.clone(),
            }),
            Err(e) => {
                debug!("Permission probe failed: {}", e);
                report.record(SyncError::PermissionDenied {
                    location: location.clone(),
                });
            }
        }

        let files = match self.storage.list_files(&location, PLAYLIST_EXTENSIONS).await {
            Ok(listing) => Some(
                listing
                    .into_iter()
                    .map(|record| (record.name.clone(), record))
                    .collect::<HashMap<_, _>>(),
            ),
            Err(e) => {
                report.record(SyncError::ListingFailed(e.to_string()));
                None
            }
        };

        let conflicts = config.conflicting_file_names();
        if !conflicts.is_empty() {
            report.record(SyncError::MappingConflict {
                file_names: conflicts.join(", "),
            });
        }

        match files {
            Some(files) if !report.has_errors() => {
                for mapping in &config.mappings {
                    self.sync_mapping(mapping, &config, &location, &files, &index, &playlists, &mut report)
                        .await;
                }
            }
            _ => report.line("All mappings were skipped"),
        }

        self.sync_log.send_replace(Some(report.log.clone()));

        if report.has_errors() {
            error!("Playlist sync pass failed:\n{}", report.log);
            self.event_bus
                .emit(CoreEvent::Sync(SyncEvent::Failed {
                    message: report.log.clone(),
                }))
                .ok();
        } else {
            info!(
                imported = report.imported,
                exported = report.exported,
                up_to_date = report.up_to_date,
                "Playlist sync pass completed"
            );
            self.event_bus
                .emit(CoreEvent::Sync(SyncEvent::Completed {
                    imported: report.imported,
                    exported: report.exported,
                    up_to_date: report.up_to_date,
                }))
                .ok();
        }

        report
    }

    #[allow(clippy::too_many_arguments)]
    async fn sync_mapping(
        &self,
        mapping: &SyncMapping,
        config: &SyncConfig,
        location: &str,
        files: &HashMap<String, ExternalFileRecord>,
        index: &LibraryIndex,
        playlists: &PlaylistMap,
        report: &mut PassReport,
    ) {
        let Some(playlist) = playlists.get(&mapping.playlist_id) else {
            report.record(SyncError::PlaylistMissing {
                file_name: mapping.file_name.clone(),
            });
            return;
        };
        let name = display_name(mapping.playlist_id, playlist);

        let Some(record) = files.get(&mapping.file_name) else {
            report.record(SyncError::FileMissing {
                playlist: name,
                file_name: mapping.file_name.clone(),
            });
            return;
        };

        let Some(file_modified) = record.last_modified else {
            report.record(SyncError::NoFileTimestamp {
                playlist: name,
                file_name: mapping.file_name.clone(),
            });
            return;
        };

        if playlist.last_modified < file_modified {
            match self
                .import_mapping(mapping.playlist_id, &name, record, file_modified, config, index)
                .await
            {
                Ok(()) => {
                    report.imported += 1;
                    report.line(format!("Imported {} from {}", name, record.name));
                }
                Err(e) => report.record(e),
            }
        } else if playlist.last_modified > file_modified {
            match self
                .export_mapping(mapping.playlist_id, &name, playlist, record, config, location, index)
                .await
            {
                Ok(()) => {
                    report.exported += 1;
                    report.line(format!("Exported {} to {}", name, record.name));
                }
                Err(e) => report.record(e),
            }
        } else {
            report.up_to_date += 1;
            report.line(format!("{} and {} are up to date", name, record.name));
        }
    }

    async fn import_mapping(
        &self,
        id: PlaylistId,
        name: &str,
        record: &ExternalFileRecord,
        file_modified: i64,
        config: &SyncConfig,
        index: &LibraryIndex,
    ) -> Result<(), SyncError> {
        let bytes = self.storage.read(record).await.map_err(|e| SyncError::ImportFailed {
            playlist: name.to_string(),
            file_name: record.name.clone(),
            cause: e.to_string(),
        })?;

        // .m3u8 implies UTF-8 regardless of the configured charset
        let charset = if record.has_extension("m3u8") {
            Some("utf-8")
        } else {
            config.charset.as_deref()
        };

        let parsed = parse_m3u(
            record.base_name(),
            &bytes,
            &index.path_set(),
            &config.io,
            charset,
            file_modified,
        );
        self.store.update(id, Some(file_modified), false, move |_| parsed);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn export_mapping(
        &self,
        id: PlaylistId,
        name: &str,
        playlist: &Playlist,
        record: &ExternalFileRecord,
        config: &SyncConfig,
        location: &str,
        index: &LibraryIndex,
    ) -> Result<(), SyncError> {
        let export_failed = |cause: String| SyncError::ExportFailed {
            playlist: name.to_string(),
            file_name: record.name.clone(),
            cause,
        };

        let realized = playlist.realize(SpecialPlaylist::of(id), index);
        let text = to_m3u(&realized, &config.io);
        self.storage
            .write(record, Bytes::from(text))
            .await
            .map_err(|e| export_failed(e.to_string()))?;

        // The storage layer may not support setting a file's modification
        // time, so read the new one back and stamp the playlist with it to
        // keep both sides equal.
        let listing = self
            .storage
            .list_files(location, PLAYLIST_EXTENSIONS)
            .await
            .map_err(|e| export_failed(e.to_string()))?;
        let new_modified = listing
            .iter()
            .find(|candidate| candidate.name == record.name)
            .and_then(|candidate| candidate.last_modified)
            .ok_or_else(|| export_failed("exported file has no modification time".to_string()))?;

        self.store
            .update(id, Some(new_modified), false, |current| current.clone());
        Ok(())
    }
}
