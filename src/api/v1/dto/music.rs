/*
 * Responsibility
 * - Request/response DTOs for the music routes
 * - validate() for path/query input before anything goes upstream
 */
use serde::{Deserialize, Serialize};

pub const RECENTLY_PLAYED_DEFAULT_LIMIT: u8 = 20;
pub const RECENTLY_PLAYED_MAX_LIMIT: u8 = 50;
pub const LIMIT_OUT_OF_RANGE: &str = "limit must be between 1 and 50";

/// Success envelope: `{"message": "success", "body": ...}`.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub message: &'static str,
    pub body: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(body: T) -> Self {
        Self {
            message: "success",
            body,
        }
    }
}

/// Spotify ids are base62; anything else can't name a playlist.
pub fn validate_playlist_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("playlist id is required");
    }
    if id.len() > 64 || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("playlist id must be alphanumeric");
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentlyPlayedQuery {
    pub limit: Option<u8>,
}

impl RecentlyPlayedQuery {
    pub fn validate(&self) -> Result<u8, &'static str> {
        match self.limit {
            None => Ok(RECENTLY_PLAYED_DEFAULT_LIMIT),
            Some(n) if (1..=RECENTLY_PLAYED_MAX_LIMIT).contains(&n) => Ok(n),
            Some(_) => Err(LIMIT_OUT_OF_RANGE),
        }
    }
}
