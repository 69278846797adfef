/*
 * Responsibility
 * - Load settings from the environment (.env supported)
 * - Validate them; anything missing or malformed is a startup failure
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::spotify::{
    SpotifyCredentials, TokenCacheSettings, catalog::DEFAULT_API_BASE_URL,
    provider::DEFAULT_TOKEN_URL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub redis_url: String,

    pub spotify: SpotifyCredentials,
    pub spotify_token_url: Url,
    pub spotify_api_base_url: Url,
    // Timeout for catalog calls made on behalf of clients
    pub upstream_timeout: Duration,

    pub token_cache: TokenCacheSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = match var("PORT") {
            Some(s) => s.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        // `ENV` is the name the first deployments used.
        let app_env = var("APP_ENV")
            .or_else(|| var("ENV"))
            .map_or(AppEnv::Development, |raw| AppEnv::parse(&raw));

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let redis_url = match var("REDIS_URL") {
            Some(url) => url,
            None => redis_url_from_parts(
                &var("REDIS_ADDR").ok_or(ConfigError::Missing("REDIS_URL"))?,
                var("REDIS_PASSWORD").as_deref(),
                var("REDIS_DB").as_deref(),
            )?,
        };

        let spotify = SpotifyCredentials {
            client_id: var("SPOTIFY_CLIENT_ID").ok_or(ConfigError::Missing("SPOTIFY_CLIENT_ID"))?,
            client_secret: var("SPOTIFY_CLIENT_SECRET")
                .ok_or(ConfigError::Missing("SPOTIFY_CLIENT_SECRET"))?,
            refresh_token: var("SPOTIFY_REFRESH_TOKEN"),
        };

        let spotify_token_url = parse_url(
            var("SPOTIFY_TOKEN_URL").as_deref().unwrap_or(DEFAULT_TOKEN_URL),
            "SPOTIFY_TOKEN_URL",
        )?;
        let spotify_api_base_url = parse_url(
            var("SPOTIFY_API_BASE_URL")
                .as_deref()
                .unwrap_or(DEFAULT_API_BASE_URL),
            "SPOTIFY_API_BASE_URL",
        )?;

        let secs = |key: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match var(key) {
                Some(s) => s
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::Invalid(key)),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let upstream_timeout = secs("UPSTREAM_TIMEOUT_SECONDS", 10)?;

        let defaults = TokenCacheSettings::default();
        let lock_ttl = secs("TOKEN_LOCK_TTL_SECONDS", defaults.lock_ttl.as_secs())?;
        let retry_delay = match var("TOKEN_RETRY_DELAY_MS") {
            Some(s) => s
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid("TOKEN_RETRY_DELAY_MS"))?,
            None => defaults.retry_delay,
        };
        let token_cache = TokenCacheSettings {
            safety_margin: secs(
                "TOKEN_SAFETY_MARGIN_SECONDS",
                defaults.safety_margin.as_secs(),
            )?,
            lock_ttl,
            retry_delay,
            wait_budget: secs("TOKEN_WAIT_BUDGET_SECONDS", (lock_ttl * 3).as_secs())?,
            provider_timeout: secs(
                "TOKEN_PROVIDER_TIMEOUT_SECONDS",
                defaults.provider_timeout.as_secs(),
            )?,
        };
        validate_token_cache(&token_cache)?;

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            redis_url,
            spotify,
            spotify_token_url,
            spotify_api_base_url,
            upstream_timeout,
            token_cache,
        })
    }
}

fn parse_url(raw: &str, key: &'static str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|_| ConfigError::Invalid(key))
}

fn redis_url_from_parts(
    addr: &str,
    password: Option<&str>,
    db: Option<&str>,
) -> Result<String, ConfigError> {
    let db: u32 = match db {
        Some(s) => s.parse().map_err(|_| ConfigError::Invalid("REDIS_DB"))?,
        None => 0,
    };

    let mut url =
        Url::parse(&format!("redis://{addr}")).map_err(|_| ConfigError::Invalid("REDIS_ADDR"))?;
    if let Some(password) = password {
        url.set_password(Some(password))
            .map_err(|_| ConfigError::Invalid("REDIS_PASSWORD"))?;
    }
    url.set_path(&format!("/{db}"));

    Ok(url.to_string())
}

fn validate_token_cache(settings: &TokenCacheSettings) -> Result<(), ConfigError> {
    if settings.lock_ttl.is_zero() {
        return Err(ConfigError::Invalid("TOKEN_LOCK_TTL_SECONDS"));
    }
    if settings.retry_delay.is_zero() {
        return Err(ConfigError::Invalid("TOKEN_RETRY_DELAY_MS"));
    }
    // A provider call outliving the lock would let a second refresher in.
    if settings.provider_timeout.is_zero() || settings.provider_timeout >= settings.lock_ttl {
        return Err(ConfigError::Invalid("TOKEN_PROVIDER_TIMEOUT_SECONDS"));
    }
    if settings.wait_budget < settings.lock_ttl {
        return Err(ConfigError::Invalid("TOKEN_WAIT_BUDGET_SECONDS"));
    }
    Ok(())
}
