//! # Sync Module
//!
//! Orchestrates full resynchronization of the song catalog and its
//! image assets from the content API into the local store.
//!
//! ## Overview
//!
//! A sync run moves through strictly sequential phases:
//!
//! 1. Fetch the full catalog via the content gateway
//! 2. Replace the local song table in one transaction (full-replace,
//!    no diffing; stale songs disappear)
//! 3. Derive the image assets referenced by the new catalog
//! 4. Download assets in bounded batches, tolerating per-item failures
//!
//! Progress is observable as `{phase, current, total}` through a watch
//! channel for UI binding; start/completion/failure are announced on the
//! event bus.

pub mod coordinator;
pub mod error;

pub use coordinator::{
    SyncConfig, SyncCoordinator, SyncPhase, SyncProgress, SyncSummary, DEFAULT_ASSET_BATCH_SIZE,
};
pub use error::{Result, SyncError};
