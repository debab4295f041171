//! # Local Store Module
//!
//! Owns the on-device hymnal database and provides repository patterns
//! for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and additive migrations
//! - Repository patterns for songs, asset blobs, session/user records,
//!   playlists, and preferences
//! - The [`LocalStore`](store::LocalStore) facade, including the two-tier
//!   wipe used when a session is invalidated server-side

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{
    AssetBlob, Author, Category, MelodyNotation, NoteAssetRef, Playlist, Preferences,
    SessionRecord, Song, TextSize, UserRecord, Verse,
};
pub use store::LocalStore;
