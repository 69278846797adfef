/*
 * Responsibility
 * - URL layout of v1
 * - Paths match the ones existing clients already call
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::{
    health::health,
    music::{get_currently_playing, get_playlist, get_playlist_tracks, get_recently_played},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/musics/{playlist_id}", get(get_playlist))
        .route("/musics/{playlist_id}/tracks", get(get_playlist_tracks))
        .route("/me/player/recently-played", get(get_recently_played))
        .route("/me/player/currently-playing", get(get_currently_playing))
}
