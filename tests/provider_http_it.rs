use std::{sync::Arc, time::Duration};

use httpmock::prelude::*;
use serde_json::json;
use spotify_proxy::services::{
    cache::MemoryCache,
    lock::CacheLock,
    spotify::{
        CredentialProvider, ProviderError, SpotifyCredentialProvider, SpotifyCredentials,
        TokenCache, TokenCacheSettings,
    },
};
use url::Url;

// base64("id:secret")
const BASIC_AUTH: &str = "Basic aWQ6c2VjcmV0";

fn credentials(refresh_token: Option<&str>) -> SpotifyCredentials {
    SpotifyCredentials {
        client_id: "id".into(),
        client_secret: "secret".into(),
        refresh_token: refresh_token.map(str::to_string),
    }
}

fn provider(server: &MockServer, refresh_token: Option<&str>) -> SpotifyCredentialProvider {
    provider_with_timeout(server, refresh_token, Duration::from_secs(5))
}

fn provider_with_timeout(
    server: &MockServer,
    refresh_token: Option<&str>,
    timeout: Duration,
) -> SpotifyCredentialProvider {
    let url = Url::parse(&server.url("/api/token")).expect("mock server url should parse");

    SpotifyCredentialProvider::new(credentials(refresh_token), url, timeout)
        .expect("provider should build")
}

#[tokio::test]
async fn client_credentials_exchange() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/token")
                .header("authorization", BASIC_AUTH)
                .header("content-type", "application/x-www-form-urlencoded")
                .body("grant_type=client_credentials");
            then.status(200).json_body(json!({
                "access_token": "cc-token",
                "token_type": "Bearer",
                "expires_in": 3600
            }));
        })
        .await;

    let token = provider(&server, None)
        .fetch_token()
        .await
        .expect("exchange should succeed");

    assert_eq!(token.token(), "cc-token");
    assert_eq!(token.expires_in(), 3600);
    mock.assert_async().await;
}

#[tokio::test]
async fn refresh_token_exchange() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/token")
                .header("authorization", BASIC_AUTH)
                .body("grant_type=refresh_token&refresh_token=rt-123");
            then.status(200).json_body(json!({
                "access_token": "user-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "user-read-recently-played"
            }));
        })
        .await;

    let token = provider(&server, Some("rt-123"))
        .fetch_token()
        .await
        .expect("refresh exchange should succeed");

    assert_eq!(token.token(), "user-token");
    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_exchange_keeps_status_and_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/token");
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"error":"invalid_client"}"#);
        })
        .await;

    let err = provider(&server, None)
        .fetch_token()
        .await
        .expect_err("400 should be an error");

    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_client"));
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_payload_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/token");
            then.status(200).body("not json");
        })
        .await;

    let err = provider(&server, None)
        .fetch_token()
        .await
        .expect_err("garbage should not decode");

    assert!(matches!(err, ProviderError::Decode(_)));
}

#[tokio::test]
async fn slow_endpoint_hits_request_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/token");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!({"access_token": "late", "expires_in": 3600}));
        })
        .await;

    let err = provider_with_timeout(&server, None, Duration::from_millis(200))
        .fetch_token()
        .await
        .expect_err("slow endpoint should time out");

    assert!(matches!(err, ProviderError::Timeout(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let url = Url::parse("http://127.0.0.1:1/api/token").expect("static url should parse");
    let provider = SpotifyCredentialProvider::new(credentials(None), url, Duration::from_secs(2))
        .expect("provider should build");

    let err = provider
        .fetch_token()
        .await
        .expect_err("nothing listens on port 1");

    assert!(matches!(err, ProviderError::Transport(_)));
}

#[tokio::test]
async fn token_cache_over_real_provider_calls_endpoint_once() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/token");
            then.status(200).json_body(json!({
                "access_token": "shared-token",
                "token_type": "Bearer",
                "expires_in": 3600
            }));
        })
        .await;

    let cache = Arc::new(MemoryCache::new());
    let tokens = TokenCache::new(
        Arc::clone(&cache),
        Arc::new(CacheLock::new(Arc::clone(&cache))),
        Arc::new(provider(&server, None)),
        TokenCacheSettings::default(),
    );

    let first = tokens.get_token().await.expect("first call should refresh");
    let second = tokens.get_token().await.expect("second call should hit the cache");

    assert_eq!(first.token(), "shared-token");
    assert_eq!(second.token(), "shared-token");
    mock.assert_calls_async(1).await;
}
