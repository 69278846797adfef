pub mod catalog;
pub mod model;
pub mod provider;
pub mod token;

pub use catalog::{CatalogClient, CatalogError};
pub use provider::{CredentialProvider, ProviderError, SpotifyCredentialProvider, SpotifyCredentials};
pub use token::{AccessToken, TokenCache, TokenCacheSettings, TokenError, TokenSource};
