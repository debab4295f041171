//! Content API connector implementation
//!
//! Implements the `ContentProvider` trait against the remote content
//! service: one GraphQL query for the song catalog, plus authenticated
//! binary asset downloads.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use core_auth::invalidation::InvalidationHandler;
use core_auth::session::TokenSource;
use core_auth::types::RemoteError;
use core_library::models::{
    Author, Category, MelodyNotation, NoteAssetRef, Song, Verse,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{GatewayError, Result};
use crate::types::{GraphqlResponse, RemoteSong};

/// The catalog query: approved songs only, capped at 5000, with nested
/// verses, authors, melody notations, sheet files, and categories.
/// Response order is meaningful: it defines the display ordinals.
const CATALOG_QUERY: &str = "{ songs(filter: { review_status: { _eq: \"approved\" } }, limit: 5000) \
     { id title \
       text { verses { text annotation suggested_revision } \
              authors { author { first_name last_name year_of_death } } } \
       melody { notations { name notation is_default asset_id } \
                authors { author { first_name last_name year_of_death } } \
                sheets { file { id filename } } } \
       categories { category { id name } } } }";

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the content service, without a trailing slash.
    pub base_url: String,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }
}

/// Remote catalog operations consumed by the sync orchestrator.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Fetch the full song catalog. The returned songs carry 1-based
    /// ordinals assigned in response order.
    async fn fetch_song_catalog(&self) -> Result<Vec<Song>>;

    /// Fetch one binary asset by its remote id.
    async fn fetch_asset(&self, asset_id: &str) -> Result<Bytes>;
}

/// Production gateway over the content API.
///
/// Both operations follow the authenticate-retry protocol: on an HTTP 401
/// the gateway attempts exactly one token refresh, then retries the same
/// operation exactly once. A second failure surfaces to the caller; there
/// are no further retries against a possibly-invalid session. Every
/// surfaced error is first handed to the invalidation detector.
pub struct ContentGateway {
    config: GatewayConfig,
    http: Arc<dyn HttpClient>,
    tokens: Arc<dyn TokenSource>,
    invalidation: Arc<InvalidationHandler>,
}

impl ContentGateway {
    pub fn new(
        config: GatewayConfig,
        http: Arc<dyn HttpClient>,
        tokens: Arc<dyn TokenSource>,
        invalidation: Arc<InvalidationHandler>,
    ) -> Self {
        Self {
            config,
            http,
            tokens,
            invalidation,
        }
    }

    /// Attach the current bearer token, when one is available. Requests
    /// without a session go out unauthenticated and let the server decide.
    async fn authorize(&self, request: HttpRequest) -> HttpRequest {
        match self.tokens.current_token().await {
            Some(token) => request.bearer_token(token),
            None => request,
        }
    }

    async fn execute_catalog_query(&self) -> Result<Vec<Song>> {
        let request = HttpRequest::post(format!("{}/graphql", self.config.base_url))
            .json(&json!({ "query": CATALOG_QUERY }))?;
        let request = self.authorize(request).await;

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(GatewayError::Api(RemoteError::from_response(&response)));
        }

        let parsed: GraphqlResponse = response
            .json()
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        // GraphQL reports some failures in-band with HTTP 200
        if let Some(errors) = parsed.errors {
            return Err(GatewayError::Api(RemoteError::from_body(
                json!({ "errors": errors }),
            )));
        }

        let data = parsed
            .data
            .ok_or_else(|| GatewayError::Parse("response carried no data".to_string()))?;

        Ok(transform_catalog(data.songs))
    }

    async fn execute_asset_fetch(&self, asset_id: &str) -> Result<Bytes> {
        let request =
            HttpRequest::get(format!("{}/assets/{}", self.config.base_url, asset_id));
        let request = self.authorize(request).await;

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(GatewayError::Api(RemoteError::from_response(&response)));
        }

        Ok(response.body)
    }

    /// Run the invalidation detector over an error before surfacing it.
    async fn surface(&self, error: GatewayError) -> GatewayError {
        self.invalidation.inspect(&error.to_remote()).await;
        error
    }

    /// Shared authenticate-retry driver for both operations.
    async fn with_auth_retry<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        match operation().await {
            Ok(value) => Ok(value),
            Err(err) if err.is_unauthorized() => {
                info!("Authorization failed, refreshing token and retrying once");
                if self.tokens.refresh().await {
                    match operation().await {
                        Ok(value) => Ok(value),
                        Err(retry_err) => {
                            warn!(error = %retry_err, "Retry after refresh failed");
                            Err(self.surface(retry_err).await)
                        }
                    }
                } else {
                    Err(self.surface(err).await)
                }
            }
            Err(err) => Err(self.surface(err).await),
        }
    }
}

#[async_trait]
impl ContentProvider for ContentGateway {
    #[instrument(skip(self))]
    async fn fetch_song_catalog(&self) -> Result<Vec<Song>> {
        info!("Fetching song catalog");

        let songs = self
            .with_auth_retry(|| self.execute_catalog_query())
            .await?;

        info!(count = songs.len(), "Fetched song catalog");
        Ok(songs)
    }

    #[instrument(skip(self), fields(asset_id = %asset_id))]
    async fn fetch_asset(&self, asset_id: &str) -> Result<Bytes> {
        debug!("Fetching asset");

        let bytes = self
            .with_auth_retry(|| self.execute_asset_fetch(asset_id))
            .await?;

        debug!(bytes = bytes.len(), "Fetched asset");
        Ok(bytes)
    }
}

/// Flatten the remote catalog, assigning 1-based ordinals in response order.
fn transform_catalog(songs: Vec<RemoteSong>) -> Vec<Song> {
    songs
        .into_iter()
        .enumerate()
        .map(|(index, song)| transform_song(song, index as u32 + 1))
        .collect()
}

/// Flatten one nested remote song. Null text/melody blocks default to
/// empty collections; verses are numbered 1-based in response order.
fn transform_song(remote: RemoteSong, ordinal: u32) -> Song {
    let (verses, text_authors) = match remote.text {
        Some(text) => {
            let verses = text
                .verses
                .into_iter()
                .enumerate()
                .map(|(index, verse)| Verse {
                    number: index as u32 + 1,
                    text: verse.text,
                    annotation: verse.annotation,
                    suggested_revision: verse.suggested_revision,
                })
                .collect();
            let authors = text.authors.into_iter().map(transform_author).collect();
            (verses, authors)
        }
        None => (Vec::new(), Vec::new()),
    };

    let (melodies, melody_authors, note_assets) = match remote.melody {
        Some(melody) => {
            let notations = melody
                .notations
                .into_iter()
                .map(|notation| MelodyNotation {
                    name: notation.name,
                    notation: notation.notation,
                    is_default: notation.is_default,
                    asset_id: notation.asset_id,
                })
                .collect();
            let authors = melody.authors.into_iter().map(transform_author).collect();
            let assets = melody
                .sheets
                .into_iter()
                .map(|sheet| NoteAssetRef {
                    id: sheet.file.id,
                    filename: sheet.file.filename,
                })
                .collect();
            (notations, authors, assets)
        }
        None => (Vec::new(), Vec::new(), Vec::new()),
    };

    let categories = remote
        .categories
        .into_iter()
        .map(|link| Category {
            id: link.category.id,
            name: link.category.name,
        })
        .collect();

    Song {
        id: remote.id,
        ordinal,
        title: remote.title,
        verses,
        text_authors,
        melodies,
        melody_authors,
        note_assets,
        categories,
    }
}

fn transform_author(link: crate::types::RemoteAuthorLink) -> Author {
    Author {
        first_name: link.author.first_name,
        last_name: link.author.last_name,
        year_of_death: link.author.year_of_death,
    }
}
