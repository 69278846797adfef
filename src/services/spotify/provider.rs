//! Credential exchange against the Spotify accounts service.
//!
//! One POST per call, form-encoded, Basic auth from the client id/secret:
//! - `grant_type=client_credentials` by default
//! - `grant_type=refresh_token&refresh_token=...` when a refresh credential is configured
//!
//! The HTTP client carries a request timeout so a hung provider cannot hold the
//! refresh lock longer than the lock TTL.
use async_trait::async_trait;
use serde::Deserialize;
use std::{fmt, time::Duration};
use thiserror::Error;
use url::Url;

use crate::services::spotify::token::{AccessToken, TokenError};

pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("token endpoint did not answer within {0:?}")]
    Timeout(Duration),

    #[error("malformed token response: {0}")]
    Decode(String),
}

/// Source of fresh access tokens.
#[async_trait]
pub trait CredentialProvider: Send + Sync + 'static {
    /// Fails with [`TokenError::Configuration`] when the provider can never succeed.
    fn ensure_configured(&self) -> Result<(), TokenError>;

    async fn fetch_token(&self) -> Result<AccessToken, ProviderError>;
}

#[derive(Clone, Default)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl SpotifyCredentials {
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.client_id.trim().is_empty() {
            return Err(TokenError::Configuration("SPOTIFY_CLIENT_ID"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(TokenError::Configuration("SPOTIFY_CLIENT_SECRET"));
        }
        if self
            .refresh_token
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            return Err(TokenError::Configuration("SPOTIFY_REFRESH_TOKEN"));
        }
        Ok(())
    }

    fn grant_type(&self) -> &'static str {
        if self.refresh_token.is_some() {
            "refresh_token"
        } else {
            "client_credentials"
        }
    }

    fn grant_form(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![("grant_type", self.grant_type())];
        if let Some(refresh_token) = &self.refresh_token {
            form.push(("refresh_token", refresh_token.as_str()));
        }
        form
    }
}

/// Wire shape of a token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    // Missing means "no validity promised": cached for the minimum TTL only.
    #[serde(default)]
    expires_in: Option<u64>,
}

pub(crate) fn decode_token_response(body: &[u8]) -> Result<AccessToken, ProviderError> {
    let parsed: TokenResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    if parsed.access_token.trim().is_empty() {
        return Err(ProviderError::Decode("empty access_token".into()));
    }

    Ok(AccessToken::new(
        parsed.access_token,
        parsed.expires_in.unwrap_or(0),
    ))
}

/// reqwest-backed [`CredentialProvider`] for the Spotify accounts service.
#[derive(Clone, Debug)]
pub struct SpotifyCredentialProvider {
    http: reqwest::Client,
    token_url: Url,
    credentials: SpotifyCredentials,
    timeout: Duration,
}

impl SpotifyCredentialProvider {
    pub fn new(
        credentials: SpotifyCredentials,
        token_url: Url,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        // Token endpoints answer directly; a redirect here is a misconfiguration.
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ProviderError::Transport)?;

        Ok(Self {
            http,
            token_url,
            credentials,
            timeout,
        })
    }
}

#[async_trait]
impl CredentialProvider for SpotifyCredentialProvider {
    fn ensure_configured(&self) -> Result<(), TokenError> {
        self.credentials.validate()
    }

    async fn fetch_token(&self) -> Result<AccessToken, ProviderError> {
        let res = self
            .http
            .post(self.token_url.clone())
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&self.credentials.grant_form())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::Transport(e)
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                grant_type = self.credentials.grant_type(),
                "token endpoint rejected credential exchange"
            );
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = res.bytes().await.map_err(ProviderError::Transport)?;
        decode_token_response(&body)
    }
}
