//! Domain models for the hymnal store
//!
//! This module contains the domain models with validation and database mapping.
//! Songs are immutable from the store's perspective once synced: a resync
//! replaces the whole table rather than patching rows.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Key of the singleton session row in the `auth` table.
pub const CURRENT_SESSION_ID: &str = "current";

/// Key of the singleton preferences row.
pub const DEFAULT_PREFERENCES_ID: &str = "default";

// =============================================================================
// Song catalog models
// =============================================================================

/// A text or melody author linked to a song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
    /// Year of death, if the author is deceased (used for public-domain display).
    pub year_of_death: Option<i32>,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

/// A single verse of a song's lyrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    /// 1-based verse number in display order.
    pub number: u32,
    pub text: String,
    /// Optional editorial annotation attached to the verse.
    pub annotation: Option<String>,
    /// Optional suggested wording change, shown in review contexts only.
    pub suggested_revision: Option<String>,
}

/// One notation variant of a song's melody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MelodyNotation {
    pub name: String,
    /// Textual music notation (rendered client-side).
    pub notation: String,
    pub is_default: bool,
    /// Remote asset backing this notation, if one exists.
    pub asset_id: Option<String>,
}

/// Reference to a remote binary asset (a scanned note sheet image).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteAssetRef {
    pub id: String,
    pub filename: String,
}

impl NoteAssetRef {
    /// Lowercased filename extension, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// A category a song is linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A song in the local catalog.
///
/// `ordinal` is the 1-based display-order index assigned at transform time,
/// following the remote response order. It is unique per sync generation but
/// may change across resyncs; only `id` is durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub ordinal: u32,
    pub title: String,
    pub verses: Vec<Verse>,
    pub text_authors: Vec<Author>,
    pub melodies: Vec<MelodyNotation>,
    pub melody_authors: Vec<Author>,
    pub note_assets: Vec<NoteAssetRef>,
    pub categories: Vec<Category>,
}

impl Song {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Song id must not be empty".to_string());
        }
        if self.ordinal == 0 {
            return Err("Song ordinal is 1-based and must not be zero".to_string());
        }
        if self.title.is_empty() {
            return Err("Song title must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Asset blobs
// =============================================================================

/// A downloaded binary asset, keyed by its remote asset id.
///
/// Blobs are strictly optional relative to songs: a song whose assets were
/// never downloaded still renders from its verses and notation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AssetBlob {
    pub id: String,
    pub filename: String,
    pub data: Vec<u8>,
}

impl AssetBlob {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            data,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Asset id must not be empty".to_string());
        }
        if self.data.is_empty() {
            return Err("Asset data must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Session & user records
// =============================================================================

/// The persisted auth session. At most one row exists at any time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SessionRecord {
    /// Always [`CURRENT_SESSION_ID`].
    pub id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as Unix epoch milliseconds.
    pub expires_at: i64,
}

impl SessionRecord {
    pub fn new(access_token: String, refresh_token: String, expires_at: i64) -> Self {
        Self {
            id: CURRENT_SESSION_ID.to_string(),
            access_token,
            refresh_token,
            expires_at,
        }
    }
}

// Tokens never appear in logs.
impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("id", &self.id)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The persisted user profile paired with the session. At most one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub activated: bool,
    /// Debug bypass: when set, collaborators use a statically configured
    /// token instead of the session.
    pub skip_auth: bool,
}

// =============================================================================
// Playlists
// =============================================================================

/// A user-created playlist. Lifecycle is independent of sync; `song_ids` may
/// reference songs that no longer exist locally after a resync, and readers
/// must tolerate missing lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub emoji: String,
    /// Ordered song ids; duplicates are disallowed.
    pub song_ids: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Playlist {
    /// Create a new playlist with a random id and the default emoji.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_emoji(name, "🎵")
    }

    pub fn with_emoji(name: impl Into<String>, emoji: impl Into<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            emoji: emoji.into(),
            song_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Playlist id must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Playlist name must not be empty".to_string());
        }
        Ok(())
    }

    pub fn contains(&self, song_id: &str) -> bool {
        self.song_ids.iter().any(|id| id == song_id)
    }

    /// Append a song id. Adding an id already present is a no-op.
    ///
    /// Returns `true` if the playlist changed.
    pub fn add_song(&mut self, song_id: impl Into<String>) -> bool {
        let song_id = song_id.into();
        if self.contains(&song_id) {
            return false;
        }
        self.song_ids.push(song_id);
        self.touch();
        true
    }

    /// Append several song ids, skipping ones already present.
    ///
    /// Returns the number of ids actually added.
    pub fn add_songs<I, S>(&mut self, song_ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for song_id in song_ids {
            let song_id = song_id.into();
            if !self.contains(&song_id) {
                self.song_ids.push(song_id);
                added += 1;
            }
        }
        if added > 0 {
            self.touch();
        }
        added
    }

    /// Remove a song id. Returns `true` if it was present.
    pub fn remove_song(&mut self, song_id: &str) -> bool {
        let before = self.song_ids.len();
        self.song_ids.retain(|id| id != song_id);
        let removed = self.song_ids.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Replace the ordering wholesale (drag-and-drop reorder).
    pub fn reorder(&mut self, song_ids: Vec<String>) {
        self.song_ids = song_ids;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp();
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// Lower bound of the notation render scale.
pub const NOTATION_SCALE_MIN: f64 = 0.5;
/// Upper bound of the notation render scale.
pub const NOTATION_SCALE_MAX: f64 = 2.0;

/// Lyrics text size steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    Small,
    #[default]
    Medium,
    Large,
    Xlarge,
}

impl TextSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextSize::Small => "small",
            TextSize::Medium => "medium",
            TextSize::Large => "large",
            TextSize::Xlarge => "xlarge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "small" => Some(TextSize::Small),
            "medium" => Some(TextSize::Medium),
            "large" => Some(TextSize::Large),
            "xlarge" => Some(TextSize::Xlarge),
            _ => None,
        }
    }
}

impl fmt::Display for TextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display preferences. Singleton row, mutated from the settings screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Always [`DEFAULT_PREFERENCES_ID`].
    pub id: String,
    /// Render scale for the music notation, clamped to [0.5, 2.0].
    pub notation_scale: f64,
    pub text_size: TextSize,
}

impl Preferences {
    /// Set the notation scale, clamping into the supported range.
    pub fn set_notation_scale(&mut self, scale: f64) {
        self.notation_scale = scale.clamp(NOTATION_SCALE_MIN, NOTATION_SCALE_MAX);
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            id: DEFAULT_PREFERENCES_ID.to_string(),
            notation_scale: 1.0,
            text_size: TextSize::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_song(id: &str, ordinal: u32) -> Song {
        Song {
            id: id.to_string(),
            ordinal,
            title: format!("Song {}", id),
            verses: vec![Verse {
                number: 1,
                text: "Lobet den Herrn".to_string(),
                annotation: None,
                suggested_revision: None,
            }],
            text_authors: vec![],
            melodies: vec![],
            melody_authors: vec![],
            note_assets: vec![],
            categories: vec![],
        }
    }

    #[test]
    fn test_song_validation() {
        assert!(sample_song("s1", 1).validate().is_ok());

        let mut song = sample_song("s1", 1);
        song.ordinal = 0;
        assert!(song.validate().is_err());

        let mut song = sample_song("s1", 1);
        song.title.clear();
        assert!(song.validate().is_err());
    }

    #[test]
    fn test_note_asset_extension() {
        let asset = NoteAssetRef {
            id: "a1".to_string(),
            filename: "melody.PNG".to_string(),
        };
        assert_eq!(asset.extension().as_deref(), Some("png"));

        let no_ext = NoteAssetRef {
            id: "a2".to_string(),
            filename: "noextension".to_string(),
        };
        assert_eq!(no_ext.extension(), None);

        let hidden = NoteAssetRef {
            id: "a3".to_string(),
            filename: ".gitignore".to_string(),
        };
        assert_eq!(hidden.extension(), None);
    }

    #[test]
    fn test_playlist_add_song_is_idempotent() {
        let mut playlist = Playlist::new("Favorites");

        assert!(playlist.add_song("s1"));
        assert!(playlist.add_song("s2"));
        assert_eq!(playlist.song_ids.len(), 2);

        // Re-adding an existing id must not change the list
        assert!(!playlist.add_song("s1"));
        assert_eq!(playlist.song_ids.len(), 2);
        assert_eq!(playlist.song_ids, vec!["s1", "s2"]);
    }

    #[test]
    fn test_playlist_add_songs_filters_duplicates() {
        let mut playlist = Playlist::new("Mixed");
        playlist.add_song("s1");

        let added = playlist.add_songs(["s1", "s2", "s3"]);
        assert_eq!(added, 2);
        assert_eq!(playlist.song_ids, vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn test_playlist_remove_and_reorder() {
        let mut playlist = Playlist::new("Order");
        playlist.add_songs(["s1", "s2", "s3"]);

        assert!(playlist.remove_song("s2"));
        assert!(!playlist.remove_song("s2"));
        assert_eq!(playlist.song_ids, vec!["s1", "s3"]);

        playlist.reorder(vec!["s3".to_string(), "s1".to_string()]);
        assert_eq!(playlist.song_ids, vec!["s3", "s1"]);
    }

    #[test]
    fn test_playlist_validation() {
        let mut playlist = Playlist::new("ok");
        assert!(playlist.validate().is_ok());
        playlist.name = "   ".to_string();
        assert!(playlist.validate().is_err());
    }

    #[test]
    fn test_preferences_scale_clamping() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.notation_scale, 1.0);

        prefs.set_notation_scale(5.0);
        assert_eq!(prefs.notation_scale, NOTATION_SCALE_MAX);

        prefs.set_notation_scale(0.1);
        assert_eq!(prefs.notation_scale, NOTATION_SCALE_MIN);

        prefs.set_notation_scale(1.25);
        assert_eq!(prefs.notation_scale, 1.25);
    }

    #[test]
    fn test_text_size_round_trip() {
        for size in [
            TextSize::Small,
            TextSize::Medium,
            TextSize::Large,
            TextSize::Xlarge,
        ] {
            assert_eq!(TextSize::parse(size.as_str()), Some(size));
        }
        assert_eq!(TextSize::parse("gigantic"), None);
    }

    #[test]
    fn test_session_record_debug_redacts_tokens() {
        let record = SessionRecord::new(
            "secret_access".to_string(),
            "secret_refresh".to_string(),
            1_700_000_000_000,
        );
        let debug = format!("{:?}", record);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret_access"));
        assert!(!debug.contains("secret_refresh"));
    }

    #[test]
    fn test_song_serialization_round_trip() {
        let song = sample_song("s1", 3);
        let json = serde_json::to_string(&song).unwrap();
        let parsed: Song = serde_json::from_str(&json).unwrap();
        assert_eq!(song, parsed);
    }
}
