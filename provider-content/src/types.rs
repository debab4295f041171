//! Wire types for the content API's GraphQL catalog response.
//!
//! The remote schema is heavily nested: authors, sheet files, and
//! categories arrive behind junction objects. These DTOs mirror that
//! shape exactly; the connector flattens them into the domain models.

use serde::Deserialize;
use serde_json::Value;

/// Top-level GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<CatalogData>,
    /// In-band GraphQL errors; present even on HTTP 200.
    #[serde(default)]
    pub errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub songs: Vec<RemoteSong>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteSong {
    pub id: String,
    pub title: String,
    /// Null when the song has no approved text yet.
    #[serde(default)]
    pub text: Option<RemoteText>,
    /// Null when the song has no melody record.
    #[serde(default)]
    pub melody: Option<RemoteMelody>,
    #[serde(default)]
    pub categories: Vec<RemoteCategoryLink>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteText {
    #[serde(default)]
    pub verses: Vec<RemoteVerse>,
    #[serde(default)]
    pub authors: Vec<RemoteAuthorLink>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteVerse {
    pub text: String,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default)]
    pub suggested_revision: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteMelody {
    #[serde(default)]
    pub notations: Vec<RemoteNotation>,
    #[serde(default)]
    pub authors: Vec<RemoteAuthorLink>,
    #[serde(default)]
    pub sheets: Vec<RemoteSheetLink>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteNotation {
    pub name: String,
    pub notation: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub asset_id: Option<String>,
}

/// Junction object wrapping an author.
#[derive(Debug, Deserialize)]
pub struct RemoteAuthorLink {
    pub author: RemoteAuthor,
}

#[derive(Debug, Deserialize)]
pub struct RemoteAuthor {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub year_of_death: Option<i32>,
}

/// Junction object wrapping a sheet file reference.
#[derive(Debug, Deserialize)]
pub struct RemoteSheetLink {
    pub file: RemoteFileRef,
}

#[derive(Debug, Deserialize)]
pub struct RemoteFileRef {
    pub id: String,
    pub filename: String,
}

/// Junction object wrapping a category.
#[derive(Debug, Deserialize)]
pub struct RemoteCategoryLink {
    pub category: RemoteCategory,
}

#[derive(Debug, Deserialize)]
pub struct RemoteCategory {
    pub id: i64,
    pub name: String,
}
