use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_uri: String,
    /// HS256 shared secret; replaces JWKS validation for local runs.
    pub dev_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub region: String,
    /// Custom S3 endpoint (LocalStack/MinIO). `None` means real AWS.
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub upload_bucket: String,
    pub distribution_bucket: String,
    /// CDN domain serving the distribution bucket.
    pub distribution_domain: Option<String>,
    pub upload_url_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| var(key).with_context(|| format!("{key} must be set"));
        let optional = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let database_url = required("DATABASE_URL")?;

        let issuer = required("AUTH_ISSUER")?;
        let jwks_uri = optional("AUTH_JWKS_URI").unwrap_or_else(|| default_jwks_uri(&issuer));
        let auth = AuthConfig {
            audience: required("AUTH_AUDIENCE")?,
            issuer,
            jwks_uri,
            dev_secret: optional("AUTH_DEV_SECRET"),
        };

        let storage = StorageConfig {
            region: var("AWS_REGION").unwrap_or_else(|| "ap-northeast-1".into()),
            endpoint: optional("S3_ENDPOINT").map(|e| e.trim_end_matches('/').to_string()),
            access_key: var("S3_ACCESS_KEY").unwrap_or_else(|| "test".into()),
            secret_key: var("S3_SECRET_KEY").unwrap_or_else(|| "test".into()),
            upload_bucket: var("S3_UPLOAD_BUCKET").unwrap_or_else(|| "meal-manager-upload".into()),
            distribution_bucket: var("S3_DISTRIBUTION_BUCKET")
                .unwrap_or_else(|| "meal-manager-distribution".into()),
            distribution_domain: optional("DISTRIBUTION_DOMAIN"),
            upload_url_ttl_secs: optional("UPLOAD_URL_TTL_SECONDS")
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .context("UPLOAD_URL_TTL_SECONDS must be a number of seconds")
                })
                .transpose()?
                .unwrap_or(60 * 60),
        };

        Ok(Self {
            database_url,
            max_connections: var("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: var("APP_PORT")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
            auth,
            storage,
        })
    }
}

fn default_jwks_uri(issuer: &str) -> String {
    format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/'))
}
