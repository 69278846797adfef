/*
 * Responsibility
 * - App-wide ApiError definition
 * - IntoResponse (HTTP status / JSON error body)
 * - Map token/catalog failures to a generic upstream error; the cause is logged, never returned
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::spotify::{CatalogError, TokenError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("upstream unavailable")]
    UpstreamUnavailable,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    /// Map a catalog failure for `resource`, logging the underlying cause.
    pub fn from_catalog(resource: &'static str, e: CatalogError) -> Self {
        if e.is_not_found() {
            tracing::debug!(resource, "catalog resource not found");
            return AppError::not_found(resource);
        }
        AppError::from(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} not found."),
            ),
            AppError::UpstreamUnavailable => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_UNAVAILABLE",
                "try later".into(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match &e {
            TokenError::Configuration(key) => {
                tracing::error!(key, "spotify credentials are not configured");
            }
            _ => tracing::error!(error = %e, "could not obtain spotify access token"),
        }
        AppError::UpstreamUnavailable
    }
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Token(inner) => inner.into(),
            CatalogError::InvalidBaseUrl(url) => {
                tracing::error!(%url, "catalog client misconfigured");
                AppError::Internal
            }
            other => {
                tracing::error!(error = %other, "catalog request failed");
                AppError::UpstreamUnavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cache::CacheError;

    #[test]
    fn token_failures_become_upstream_unavailable() {
        let err: AppError = TokenError::Store(CacheError::BackendConnection("down".into())).into();
        assert!(matches!(err, AppError::UpstreamUnavailable));

        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn catalog_not_found_keeps_its_status() {
        let err = AppError::from_catalog(
            "playlist",
            CatalogError::Status {
                status: 404,
                body: "{}".into(),
            },
        );
        assert!(matches!(err, AppError::NotFound { resource: "playlist" }));

        let err = AppError::from_catalog(
            "playlist",
            CatalogError::Status {
                status: 500,
                body: "boom".into(),
            },
        );
        assert!(matches!(err, AppError::UpstreamUnavailable));
    }
}
