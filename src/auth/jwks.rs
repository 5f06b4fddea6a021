use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::claims::Claims;
use crate::config::AuthConfig;

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const KEY_CACHE_TTL: Duration = Duration::from_secs(300);
const UNKNOWN_KID_COOLDOWN: Duration = Duration::from_secs(60);
const LEEWAY_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("signing keys unavailable: {0}")]
    KeysUnavailable(String),
}

struct KeyCache {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    fetched_at: Instant,
}

impl KeyCache {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < KEY_CACHE_TTL
    }
}

enum KeySource {
    Jwks {
        uri: String,
        http: reqwest::Client,
        cache: RwLock<Option<KeyCache>>,
        refresh_lock: Mutex<()>,
    },
    SharedSecret(Arc<DecodingKey>),
}

/// Validates bearer tokens issued by the external identity provider.
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    keys: KeySource,
}

impl TokenVerifier {
    pub fn from_config(cfg: &AuthConfig) -> anyhow::Result<Self> {
        match &cfg.dev_secret {
            Some(secret) => {
                warn!("AUTH_DEV_SECRET set; validating tokens with a shared secret instead of JWKS");
                Ok(Self::shared_secret(&cfg.issuer, &cfg.audience, secret))
            }
            None => Self::jwks(&cfg.issuer, &cfg.audience, &cfg.jwks_uri),
        }
    }

    pub fn jwks(issuer: &str, audience: &str, jwks_uri: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("build JWKS http client")?;
        Ok(Self {
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            keys: KeySource::Jwks {
                uri: jwks_uri.to_string(),
                http,
                cache: RwLock::new(None),
                refresh_lock: Mutex::new(()),
            },
        })
    }

    pub fn shared_secret(issuer: &str, audience: &str, secret: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            keys: KeySource::SharedSecret(Arc::new(DecodingKey::from_secret(secret.as_bytes()))),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let header =
            decode_header(token).map_err(|e| TokenError::Invalid(format!("bad header: {e}")))?;

        let (key, alg) = match &self.keys {
            KeySource::SharedSecret(key) => (key.clone(), Algorithm::HS256),
            KeySource::Jwks { .. } => {
                if header.alg != Algorithm::RS256 {
                    return Err(TokenError::Invalid(format!(
                        "unexpected alg {:?}",
                        header.alg
                    )));
                }
                let kid = header
                    .kid
                    .ok_or_else(|| TokenError::Invalid("missing kid".into()))?;
                (self.key_for_kid(&kid).await?, Algorithm::RS256)
            }
        };

        let mut validation = Validation::new(alg);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.leeway = LEEWAY_SECS;

        let data = decode::<Claims>(token, key.as_ref(), &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        debug!(
            sub = %data.claims.sub,
            iss = %data.claims.iss,
            exp = data.claims.exp,
            "token verified"
        );
        Ok(data.claims)
    }

    async fn key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, TokenError> {
        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }
        self.refresh_for_kid(kid).await
    }

    async fn cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let KeySource::Jwks { cache, .. } = &self.keys else {
            return None;
        };
        let cache = cache.read().await;
        cache
            .as_ref()
            .filter(|c| c.is_fresh())
            .and_then(|c| c.keys_by_kid.get(kid))
            .cloned()
    }

    /// Refetches the JWKS for a kid the cache does not know. Concurrent callers
    /// share one fetch, and a fresh key set is only refetched after
    /// `UNKNOWN_KID_COOLDOWN`.
    async fn refresh_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, TokenError> {
        let KeySource::Jwks {
            uri,
            http,
            cache,
            refresh_lock,
        } = &self.keys
        else {
            return Err(TokenError::Invalid(format!("unknown kid {kid}")));
        };
        let _guard = refresh_lock.lock().await;

        {
            let current = cache.read().await;
            if let Some(current) = current.as_ref().filter(|c| c.is_fresh()) {
                if let Some(key) = current.keys_by_kid.get(kid) {
                    return Ok(key.clone());
                }
                if current.fetched_at.elapsed() < UNKNOWN_KID_COOLDOWN {
                    debug!(%kid, "unknown kid within refresh cooldown");
                    return Err(TokenError::Invalid(format!("unknown kid {kid}")));
                }
            }
        }

        let keys_by_kid = fetch_signing_keys(http, uri).await?;
        let key = keys_by_kid.get(kid).cloned();
        *cache.write().await = Some(KeyCache {
            keys_by_kid,
            fetched_at: Instant::now(),
        });
        key.ok_or_else(|| TokenError::Invalid(format!("unknown kid {kid}")))
    }
}

async fn fetch_signing_keys(
    http: &reqwest::Client,
    uri: &str,
) -> Result<HashMap<String, Arc<DecodingKey>>, TokenError> {
    let response = http
        .get(uri)
        .send()
        .await
        .map_err(|e| TokenError::KeysUnavailable(format!("JWKS request failed: {e}")))?;
    if !response.status().is_success() {
        return Err(TokenError::KeysUnavailable(format!(
            "JWKS request returned {}",
            response.status()
        )));
    }
    let jwks: Jwks = response
        .json()
        .await
        .map_err(|e| TokenError::KeysUnavailable(format!("invalid JWKS JSON: {e}")))?;

    let keys_by_kid = signing_keys(jwks);
    if keys_by_kid.is_empty() {
        return Err(TokenError::KeysUnavailable(
            "JWKS has no usable RSA signing keys".into(),
        ));
    }
    debug!(count = keys_by_kid.len(), %uri, "JWKS refreshed");
    Ok(keys_by_kid)
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: String,
    kty: String,
    alg: Option<String>,
    #[serde(rename = "use")]
    use_: Option<String>,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

fn signing_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys = HashMap::new();
    for jwk in jwks.keys {
        if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
            continue;
        }
        if jwk.alg.as_deref().is_some_and(|a| a != "RS256") {
            continue;
        }
        if jwk.use_.as_deref().is_some_and(|u| u != "sig") {
            continue;
        }
        match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => {
                keys.insert(jwk.kid, Arc::new(key));
            }
            Err(e) => warn!(error = %e, kid = %jwk.kid, "skipping invalid JWKS key"),
        }
    }
    keys
}
