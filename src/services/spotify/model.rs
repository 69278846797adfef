//! Subset of the Spotify Web API objects the proxy passes through.
//!
//! Fields the proxy doesn't need are dropped on decode. Optional/nullable
//! upstream fields default instead of failing the whole response.
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Owner {
    #[serde(default)]
    pub display_name: Option<String>,
    pub id: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Artist {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Album {
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Track {
    // Local files have no id.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
}

/// Spotify paging object.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub href: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlaylistItem {
    #[serde(default)]
    pub added_at: Option<String>,
    // Null for tracks removed from the catalog.
    pub track: Option<Track>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    pub owner: Owner,
    pub tracks: Page<PlaylistItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlayContext {
    #[serde(rename = "type")]
    pub kind: String,
    pub uri: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RecentlyPlayedItem {
    pub track: Track,
    pub played_at: String,
    #[serde(default)]
    pub context: Option<PlayContext>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Cursors {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RecentlyPlayed {
    pub items: Vec<RecentlyPlayedItem>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub cursors: Option<Cursors>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    pub is_playing: bool,
    // Null during ads or when the item is unavailable.
    #[serde(default)]
    pub item: Option<Track>,
    #[serde(default)]
    pub currently_playing_type: Option<String>,
    #[serde(default)]
    pub context: Option<PlayContext>,
}
