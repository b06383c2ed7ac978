//! Identity-provider signing keys (JWKS).
//!
//! Responsibility:
//! - Resolve a token header `kid` into a `DecodingKey`.
//! - Cache the provider's key set and refresh it on expiry or on an unknown `kid`.
//!
//! Notes:
//! - Every failure here is reported as `KeyError`; the verifier folds it into a
//!   generic 401 so the caller never learns why key lookup failed.
//! - The remote cache is read-mostly and shared by every in-flight request.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use reqwest::header::{self, HeaderMap};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Google secure-token service key set, published as a JWKS.
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("no signing key for kid '{0}'")]
    UnknownKid(String),
    #[error("unsupported jwk: {0}")]
    UnsupportedJwk(&'static str),
    #[error("invalid jwk: {0}")]
    InvalidJwk(#[from] jsonwebtoken::errors::Error),
    #[error("jwks fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("jwks endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("jwks document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("jwks refresh skipped: last attempt failed recently")]
    Backoff,
    #[error("jwks file unreadable: {0}")]
    Read(#[from] std::io::Error),
}

/// Source of provider public keys, looked up by `kid`.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait SigningKeys: Send + Sync + 'static {
    fn source_name(&self) -> &'static str;

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyError>;
}

fn decoding_key_for(jwk: &Jwk) -> Result<DecodingKey, KeyError> {
    // Provider ID tokens are RS256 only.
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Ok(DecodingKey::from_jwk(jwk)?),
        _ => Err(KeyError::UnsupportedJwk("expected an RSA key")),
    }
}

fn find_key(jwks: &JwkSet, kid: &str) -> Result<DecodingKey, KeyError> {
    let jwk = jwks
        .find(kid)
        .ok_or_else(|| KeyError::UnknownKid(kid.to_string()))?;
    decoding_key_for(jwk)
}

/// Fixed key material, read once. Used for local development and tests.
#[derive(Debug, Clone)]
pub struct StaticKeys {
    jwks: JwkSet,
}

impl StaticKeys {
    pub fn new(jwks: JwkSet) -> Self {
        Self { jwks }
    }

    pub fn from_json(json: &str) -> Result<Self, KeyError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_file(path: &Path) -> Result<Self, KeyError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[async_trait]
impl SigningKeys for StaticKeys {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        find_key(&self.jwks, kid)
    }
}

#[derive(Debug)]
struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// JWKS fetched over HTTPS and cached in memory.
///
/// The cache lifetime follows the response's `Cache-Control: max-age`, falling
/// back to `fallback_ttl` when the header is missing.
///
/// Lookups only take the cache lock for reading. At most one fetch runs at a
/// time, outside the cache lock, so a slow provider delays callers that need a
/// refresh and nobody else.
#[derive(Debug)]
pub struct RemoteJwks {
    client: reqwest::Client,
    url: String,
    fallback_ttl: Duration,
    // Refetches (unknown kid, or retry after a failure) are spaced at least this far apart.
    min_refresh_interval: Duration,
    cache: RwLock<Option<CachedJwks>>,
    // Single-flight guard for fetches; holds the time of the last failed attempt.
    refresh_guard: Mutex<Option<Instant>>,
}

impl RemoteJwks {
    pub fn new(
        url: impl Into<String>,
        fallback_ttl: Duration,
        fetch_timeout: Duration,
    ) -> Result<Self, KeyError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("release-broker/", env!("CARGO_PKG_VERSION")))
            .timeout(fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            fallback_ttl,
            min_refresh_interval: Duration::from_secs(30),
            cache: RwLock::new(None),
            refresh_guard: Mutex::new(None),
        })
    }

    #[cfg(test)]
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    async fn fetch(&self) -> Result<CachedJwks, KeyError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(KeyError::Status(response.status()));
        }

        let ttl = max_age(response.headers()).unwrap_or(self.fallback_ttl);
        let body = response.bytes().await?;
        let jwks: JwkSet = serde_json::from_slice(&body)?;

        let now = Instant::now();
        tracing::debug!(url = %self.url, keys = jwks.keys.len(), ttl_secs = ttl.as_secs(), "jwks refreshed");

        Ok(CachedJwks {
            jwks,
            fetched_at: now,
            expires_at: now + ttl,
        })
    }

    /// Answer from the cache without fetching, if the cache can answer.
    ///
    /// A fresh set that lacks `kid` still answers (`UnknownKid`) when it was
    /// fetched less than `min_refresh_interval` ago.
    async fn cached_key(&self, kid: &str) -> Option<Result<DecodingKey, KeyError>> {
        let guard = self.cache.read().await;
        let cached = guard.as_ref().filter(|cached| cached.is_fresh())?;

        match cached.jwks.find(kid) {
            Some(jwk) => Some(decoding_key_for(jwk)),
            None if cached.fetched_at.elapsed() < self.min_refresh_interval => {
                Some(Err(KeyError::UnknownKid(kid.to_string())))
            }
            None => None,
        }
    }

    async fn refresh(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        let mut last_failure = self.refresh_guard.lock().await;

        // Another task may have refreshed while this one waited for the guard.
        if let Some(answer) = self.cached_key(kid).await {
            return answer;
        }
        if let Some(failed_at) = *last_failure
            && failed_at.elapsed() < self.min_refresh_interval
        {
            return Err(KeyError::Backoff);
        }

        match self.fetch().await {
            Ok(fresh) => {
                *last_failure = None;
                let key = find_key(&fresh.jwks, kid);
                *self.cache.write().await = Some(fresh);
                key
            }
            Err(err) => {
                tracing::warn!(url = %self.url, error = %err, "jwks refresh failed");
                *last_failure = Some(Instant::now());
                Err(err)
            }
        }
    }
}

#[async_trait]
impl SigningKeys for RemoteJwks {
    fn source_name(&self) -> &'static str {
        "remote-jwks"
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        if let Some(answer) = self.cached_key(kid).await {
            return answer;
        }
        self.refresh(kid).await
    }
}

/// `max-age` from a `Cache-Control` header, if present and well-formed.
fn max_age(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(header::CACHE_CONTROL)?.to_str().ok()?;
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
