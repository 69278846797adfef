/*
 * Responsibility
 * - Catalog proxy handlers (playlists, recently played, currently playing)
 * - Validate input, call CatalogClient, wrap the result in the success envelope
 * - Token/catalog failures surface as AppError (generic upstream error for clients)
 */
use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    api::v1::dto::music::{
        LIMIT_OUT_OF_RANGE, RecentlyPlayedQuery, SuccessResponse, validate_playlist_id,
    },
    error::AppError,
    services::spotify::model::{Playlist, RecentlyPlayed, Track},
    state::AppState,
};

pub async fn get_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> Result<Json<SuccessResponse<Playlist>>, AppError> {
    validate_playlist_id(&playlist_id)
        .map_err(|msg| AppError::bad_request("INVALID_PLAYLIST_ID", msg))?;

    let playlist = state
        .catalog
        .playlist(&playlist_id)
        .await
        .map_err(|e| AppError::from_catalog("playlist", e))?;

    Ok(Json(SuccessResponse::new(playlist)))
}

pub async fn get_playlist_tracks(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> Result<Json<SuccessResponse<Vec<Track>>>, AppError> {
    validate_playlist_id(&playlist_id)
        .map_err(|msg| AppError::bad_request("INVALID_PLAYLIST_ID", msg))?;

    let tracks = state
        .catalog
        .playlist_tracks(&playlist_id)
        .await
        .map_err(|e| AppError::from_catalog("playlist", e))?;

    Ok(Json(SuccessResponse::new(tracks)))
}

pub async fn get_recently_played(
    State(state): State<AppState>,
    query: Result<Query<RecentlyPlayedQuery>, QueryRejection>,
) -> Result<Json<SuccessResponse<RecentlyPlayed>>, AppError> {
    // Non-numeric and overflowing values get the same error as out-of-range ones.
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected recently-played query");
        AppError::bad_request("INVALID_LIMIT", LIMIT_OUT_OF_RANGE)
    })?;
    let limit = query
        .validate()
        .map_err(|msg| AppError::bad_request("INVALID_LIMIT", msg))?;

    let played = state
        .catalog
        .recently_played(limit)
        .await
        .map_err(|e| AppError::from_catalog("recently played", e))?;

    Ok(Json(SuccessResponse::new(played)))
}

pub async fn get_currently_playing(State(state): State<AppState>) -> Result<Response, AppError> {
    let playing = state
        .catalog
        .currently_playing()
        .await
        .map_err(|e| AppError::from_catalog("currently playing", e))?;

    Ok(match playing {
        Some(current) => Json(SuccessResponse::new(current)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
