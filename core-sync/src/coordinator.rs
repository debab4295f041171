//! # Sync Coordinator
//!
//! Orchestrates a full resync: fetch the catalog, replace the local song
//! table atomically, then batch-download the referenced image assets with
//! bounded concurrency and best-effort per-item failure tolerance.
//!
//! ## Guarantees
//!
//! - After a successful run, the local song table contains exactly the
//!   songs returned by the last fetch
//! - Asset coverage is best-effort and may be incomplete; a failed
//!   download never aborts the run
//! - A failure while fetching or persisting songs aborts the whole run
//!   and leaves previously cached data untouched
//! - Two overlapping `sync_all` calls are rejected with a typed error

use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use core_library::models::{AssetBlob, Song};
use core_library::repositories::{AssetRepository, SongRepository};
use core_library::store::LocalStore;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use futures::future::join_all;
use provider_content::ContentProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{info, instrument, warn};

/// How many asset downloads run concurrently within one batch.
pub const DEFAULT_ASSET_BATCH_SIZE: usize = 5;

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Concurrent downloads per batch; batches are joined before the next
    /// one starts.
    pub asset_batch_size: usize,

    /// Filename extensions (lowercase) recognized as downloadable images.
    pub image_extensions: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            asset_batch_size: DEFAULT_ASSET_BATCH_SIZE,
            image_extensions: vec![
                "png".to_string(),
                "jpg".to_string(),
                "svg".to_string(),
            ],
        }
    }
}

/// Phases of a sync run, strictly sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    FetchingSongs,
    PersistingSongs,
    DownloadingAssets,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::FetchingSongs => "fetching_songs",
            SyncPhase::PersistingSongs => "persisting_songs",
            SyncPhase::DownloadingAssets => "downloading_assets",
        };
        write!(f, "{}", name)
    }
}

/// Observable sync progress for UI binding.
///
/// `current`/`total` only carry meaning during the asset-download phase;
/// `current` counts successfully stored assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SyncProgress {
    pub phase: SyncPhase,
    pub current: usize,
    pub total: usize,
}

/// Outcome of a completed sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    /// Songs persisted from the fetched catalog.
    pub songs: usize,
    /// Image assets referenced by the catalog.
    pub assets_total: usize,
    /// Assets downloaded and stored in this run.
    pub assets_downloaded: usize,
    /// Assets that failed to download or store (non-fatal).
    pub assets_failed: usize,
    pub completed_at: DateTime<Utc>,
}

/// An image asset to download, derived from the catalog's note references.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AssetTarget {
    id: String,
    filename: String,
}

/// Coordinates full-replace catalog syncs.
pub struct SyncCoordinator {
    config: SyncConfig,
    provider: Arc<dyn ContentProvider>,
    store: Arc<LocalStore>,
    events: EventBus,
    progress_tx: watch::Sender<SyncProgress>,
    /// Held for the duration of a run; `try_lock` rejects overlap.
    in_flight: Mutex<()>,
    last_sync: RwLock<Option<DateTime<Utc>>>,
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        provider: Arc<dyn ContentProvider>,
        store: Arc<LocalStore>,
        events: EventBus,
    ) -> Self {
        let (progress_tx, _) = watch::channel(SyncProgress::default());
        Self {
            config,
            provider,
            store,
            events,
            progress_tx,
            in_flight: Mutex::new(()),
            last_sync: RwLock::new(None),
        }
    }

    /// Subscribe to progress updates.
    pub fn subscribe_progress(&self) -> watch::Receiver<SyncProgress> {
        self.progress_tx.subscribe()
    }

    /// The current progress snapshot.
    pub fn progress(&self) -> SyncProgress {
        self.progress_tx.borrow().clone()
    }

    /// Whether a sync run is currently in flight.
    pub fn is_syncing(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Completion time of the last successful run, if any.
    pub async fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.read().await
    }

    /// Run a full resync.
    ///
    /// # Errors
    ///
    /// - [`SyncError::AlreadyRunning`] when a run is already in flight
    /// - [`SyncError::Gateway`] when the catalog fetch fails (after the
    ///   gateway's authenticate-retry protocol is exhausted)
    /// - [`SyncError::Store`] when persisting the catalog fails
    ///
    /// Asset-download failures are per-item and never fail the run.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Rejecting sync: another run is in progress");
            return Err(SyncError::AlreadyRunning);
        };

        info!("Starting full sync");
        let _ = self.events.emit(CoreEvent::Sync(SyncEvent::Started));

        let outcome = self.run().await;
        self.set_progress(SyncProgress::default());

        match outcome {
            Ok(summary) => {
                *self.last_sync.write().await = Some(summary.completed_at);
                info!(
                    songs = summary.songs,
                    assets_downloaded = summary.assets_downloaded,
                    assets_failed = summary.assets_failed,
                    "Sync completed"
                );
                let _ = self.events.emit(CoreEvent::Sync(SyncEvent::Completed {
                    songs: summary.songs,
                    assets_downloaded: summary.assets_downloaded,
                    assets_failed: summary.assets_failed,
                }));
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, "Sync failed");
                let _ = self.events.emit(CoreEvent::Sync(SyncEvent::Failed {
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    async fn run(&self) -> Result<SyncSummary> {
        // Phase 1: fetch the catalog (authenticate-retry applies inside
        // the gateway)
        self.set_progress(SyncProgress {
            phase: SyncPhase::FetchingSongs,
            current: 0,
            total: 0,
        });
        let songs = self.provider.fetch_song_catalog().await?;

        // Phase 2: full-replace the song table in one transaction
        self.set_progress(SyncProgress {
            phase: SyncPhase::PersistingSongs,
            current: 0,
            total: songs.len(),
        });
        self.store.songs().replace_all(&songs).await?;

        // Phase 3: derive the image assets referenced by the new catalog
        let targets = image_asset_targets(&songs, &self.config.image_extensions);

        // Phase 4: bounded fan-out downloads, joined per batch
        self.set_progress(SyncProgress {
            phase: SyncPhase::DownloadingAssets,
            current: 0,
            total: targets.len(),
        });

        let mut downloaded = 0;
        let mut failed = 0;
        let batch_size = self.config.asset_batch_size.max(1);
        for batch in targets.chunks(batch_size) {
            let results = join_all(batch.iter().map(|target| self.download_one(target))).await;
            for ok in results {
                if ok {
                    downloaded += 1;
                } else {
                    failed += 1;
                }
            }
        }

        Ok(SyncSummary {
            songs: songs.len(),
            assets_total: targets.len(),
            assets_downloaded: downloaded,
            assets_failed: failed,
            completed_at: Utc::now(),
        })
    }

    /// Download and store one asset. Failures are logged and reported as
    /// `false`; they never abort the batch or the remaining batches.
    async fn download_one(&self, target: &AssetTarget) -> bool {
        match self.provider.fetch_asset(&target.id).await {
            Ok(bytes) => {
                let blob = AssetBlob::new(target.id.clone(), target.filename.clone(), bytes.to_vec());
                match self.store.assets().upsert(&blob).await {
                    Ok(()) => {
                        self.progress_tx.send_modify(|p| p.current += 1);
                        true
                    }
                    Err(e) => {
                        warn!(asset_id = %target.id, error = %e, "Failed to store asset");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(asset_id = %target.id, error = %e, "Failed to download asset");
                false
            }
        }
    }

    fn set_progress(&self, progress: SyncProgress) {
        // send_replace works with zero receivers, unlike send
        self.progress_tx.send_replace(progress);
    }
}

/// Collect the image assets to download: every song's note references,
/// filtered to the recognized image extensions (case-insensitive) and
/// de-duplicated by id, preserving first-seen order.
fn image_asset_targets(songs: &[Song], extensions: &[String]) -> Vec<AssetTarget> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for song in songs {
        for asset in &song.note_assets {
            let Some(extension) = asset.extension() else {
                continue;
            };
            if !extensions.iter().any(|e| *e == extension) {
                continue;
            }
            if seen.insert(asset.id.clone()) {
                targets.push(AssetTarget {
                    id: asset.id.clone(),
                    filename: asset.filename.clone(),
                });
            }
        }
    }

    targets
}
