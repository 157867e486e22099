//! OAuth access tokens.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use spotwatch_core::error::{Result, SpotwatchError};

/// Default GCE metadata server.
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://metadata.google.internal";

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before the server says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where bearer tokens come from.
#[derive(Clone, Debug)]
pub enum TokenSource {
    /// A fixed token, e.g. from `gcloud auth print-access-token`.
    Static(String),
    /// The default service account of the instance or workload.
    MetadataServer(Arc<MetadataServer>),
}

impl TokenSource {
    /// Metadata server at its well-known address.
    pub fn metadata_server() -> Self {
        Self::metadata_server_at(DEFAULT_METADATA_ENDPOINT)
    }

    /// Metadata server at `endpoint`.
    pub fn metadata_server_at(endpoint: impl Into<String>) -> Self {
        Self::MetadataServer(Arc::new(MetadataServer::new(endpoint)))
    }

    /// Returns a bearer token, fetching a fresh one if needed.
    pub async fn token(&self, http: &reqwest::Client) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::MetadataServer(server) => server.token(http).await,
        }
    }
}

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Token fetcher for the metadata server, with an in-memory cache.
#[derive(Debug)]
pub struct MetadataServer {
    endpoint: String,
    cached: RwLock<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl MetadataServer {
    /// Creates a fetcher for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            cached: RwLock::new(None),
        }
    }

    /// Returns the cached token, or fetches one.
    pub async fn token(&self, http: &reqwest::Client) -> Result<String> {
        let cached = self.cached.read().clone();
        if let Some(cached) = cached {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value);
            }
        }

        // Concurrent refreshes are harmless; the last one wins
        let fetched = self.fetch(http).await?;
        let lifetime = Duration::from_secs(fetched.expires_in).saturating_sub(EXPIRY_MARGIN);
        *self.cached.write() = Some(CachedToken {
            value: fetched.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        debug!(expires_in = fetched.expires_in, "Fetched access token from metadata server");
        Ok(fetched.access_token)
    }

    async fn fetch(&self, http: &reqwest::Client) -> Result<TokenResponse> {
        let url = format!("{}{}", self.endpoint, TOKEN_PATH);
        let response = http
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| SpotwatchError::AuthError(format!("metadata server: {e}")))?;

        if !response.status().is_success() {
            return Err(SpotwatchError::AuthError(format!(
                "metadata server returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SpotwatchError::AuthError(format!("invalid token response: {e}")))
    }
}
