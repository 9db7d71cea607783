//! Public-key JWT validation.
//!
//! The identity service publishes its RSA public key at a fixed URL as
//! `{"public_key": "<PEM>"}`. This adapter fetches it lazily, caches it and
//! validates bearer tokens against it:
//!
//! 1. Verify the RS256 signature
//! 2. Enforce `exp` (no leeway)
//! 3. Map `sub` to the user id and `rls` (role -> permissions) to roles
//!
//! # Example
//!
//! ```ignore
//! let config = PublicKeyConfig::new("http://auth:8000/api/v1/pubkey");
//! let validator = PublicKeyValidator::new(config)?;
//! let user = validator.validate("eyJ...").await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::adapters::reliability::{retry_with_backoff, BackoffPolicy};
use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Configuration for the public-key validator.
#[derive(Debug, Clone)]
pub struct PublicKeyConfig {
    pub pubkey_url: String,

    /// How long a fetched key is trusted before refetching.
    pub cache_duration: Duration,

    pub backoff: BackoffPolicy,
}

impl PublicKeyConfig {
    pub fn new(pubkey_url: impl Into<String>) -> Self {
        Self {
            pubkey_url: pubkey_url.into(),
            cache_duration: Duration::from_secs(3600),
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = duration;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Claims billing reads from an access token.
#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: String,

    #[allow(dead_code)]
    exp: i64,

    /// Role name to the permissions it carries.
    #[serde(default)]
    rls: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PublicKeyResponse {
    public_key: String,
}

struct CachedKey {
    key: DecodingKey,
    fetched_at: Instant,
    cache_duration: Duration,
}

impl CachedKey {
    fn new(key: DecodingKey, cache_duration: Duration) -> Self {
        Self {
            key,
            fetched_at: Instant::now(),
            cache_duration,
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.cache_duration
    }
}

/// Validates tokens against the identity service's published key.
pub struct PublicKeyValidator {
    config: PublicKeyConfig,
    http_client: reqwest::Client,
    key_cache: Arc<RwLock<Option<CachedKey>>>,
}

impl PublicKeyValidator {
    /// Creates the validator. The key is fetched on first validation.
    pub fn new(config: PublicKeyConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::service_unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            key_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Creates a validator with a known key that is never refetched.
    pub fn from_pem(pem: &[u8]) -> Result<Self, AuthError> {
        let key = parse_pem(pem)?;
        let config = PublicKeyConfig::new("").with_cache_duration(Duration::MAX);
        let validator = Self::new(config)?;
        *validator.key_cache.try_write().map_err(|_| {
            AuthError::service_unavailable("key cache busy during construction")
        })? = Some(CachedKey::new(key, Duration::MAX));
        Ok(validator)
    }

    async fn fetch_key(&self) -> Result<DecodingKey, AuthError> {
        let url = self.config.pubkey_url.as_str();
        tracing::debug!(url = %url, "Fetching token public key");

        let body: PublicKeyResponse = retry_with_backoff(
            &self.config.backoff,
            AuthError::is_transient,
            || async move {
                let response = self.http_client.get(url).send().await.map_err(|e| {
                    AuthError::service_unavailable(format!("Failed to fetch public key: {}", e))
                })?;

                if !response.status().is_success() {
                    return Err(AuthError::service_unavailable(format!(
                        "Public key endpoint returned {}",
                        response.status()
                    )));
                }

                response.json::<PublicKeyResponse>().await.map_err(|e| {
                    AuthError::service_unavailable(format!("Failed to parse public key: {}", e))
                })
            },
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Public key unavailable");
            e
        })?;

        parse_pem(body.public_key.as_bytes())
    }

    async fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.key_cache.read().await;
            if let Some(ref cached) = *cache {
                if !cached.is_expired() {
                    return Ok(cached.key.clone());
                }
            }
        }

        let key = self.fetch_key().await?;

        let mut cache = self.key_cache.write().await;
        *cache = Some(CachedKey::new(key.clone(), self.config.cache_duration));
        Ok(key)
    }
}

fn parse_pem(pem: &[u8]) -> Result<DecodingKey, AuthError> {
    DecodingKey::from_rsa_pem(pem).map_err(|e| {
        tracing::error!(error = %e, "Public key is not a valid RSA PEM");
        AuthError::service_unavailable("invalid public key")
    })
}

#[async_trait]
impl SessionValidator for PublicKeyValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let key = self.decoding_key().await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<AccessClaims>(token, &key, &validation)
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Token expired");
                        AuthError::TokenExpired
                    }
                    _ => {
                        tracing::warn!(error = %e, "Token validation failed");
                        AuthError::InvalidToken
                    }
                }
            })?
            .claims;

        let user_id = UserId::new(&claims.sub).map_err(|_| {
            tracing::warn!("Token carries an empty subject");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(user_id, claims.rls))
    }
}

impl std::fmt::Debug for PublicKeyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKeyValidator")
            .field("pubkey_url", &self.config.pubkey_url)
            .finish_non_exhaustive()
    }
}
