//! Catalog API client. Every call is authorized with a token from the shared
//! [`TokenSource`].
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use url::Url;

use crate::services::spotify::{
    model::{CurrentlyPlaying, Page, Playlist, PlaylistItem, RecentlyPlayed, Track},
    token::{TokenError, TokenSource},
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("catalog transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed catalog response: {0}")]
    Decode(String),

    #[error("catalog base url cannot be a base: {0}")]
    InvalidBaseUrl(Url),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::Status { status: 404, .. })
    }
}

#[derive(Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
}

impl CatalogClient {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, CatalogError> {
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidBaseUrl(base_url));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    pub async fn playlist(&self, playlist_id: &str) -> Result<Playlist, CatalogError> {
        self.get_json(&["playlists", playlist_id], &[])
            .await?
            .ok_or_else(empty_body)
    }

    /// Tracks of a playlist, skipping items whose track is no longer available.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, CatalogError> {
        let page: Page<PlaylistItem> = self
            .get_json(&["playlists", playlist_id, "tracks"], &[])
            .await?
            .ok_or_else(empty_body)?;

        Ok(page.items.into_iter().filter_map(|item| item.track).collect())
    }

    pub async fn recently_played(&self, limit: u8) -> Result<RecentlyPlayed, CatalogError> {
        self.get_json(
            &["me", "player", "recently-played"],
            &[("limit", limit.to_string())],
        )
        .await?
        .ok_or_else(empty_body)
    }

    /// `None` when nothing is playing (upstream answers 204).
    pub async fn currently_playing(&self) -> Result<Option<CurrentlyPlaying>, CatalogError> {
        self.get_json(&["me", "player", "currently-playing"], &[])
            .await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = self.base_url.clone();
        // Segments are percent-encoded, so ids cannot escape the path.
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Option<T>, CatalogError> {
        let url = self.endpoint(segments)?;
        let token = self.tokens.access_token().await?;

        let res = self
            .http
            .get(url)
            .bearer_auth(token.token())
            .query(query)
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

fn empty_body() -> CatalogError {
    CatalogError::Decode("unexpected empty response".into())
}
