use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};

use crate::config::StorageConfig;
use crate::domain::ImageId;

/// Staging/distribution image storage. Objects are keyed by image id in both buckets.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Pre-signed PUT URL on the upload bucket.
    async fn presign_upload(&self, image_id: ImageId) -> anyhow::Result<String>;
    /// Server-side copy from the upload bucket to the distribution bucket.
    async fn copy_to_distribution(&self, image_id: ImageId) -> anyhow::Result<()>;
    /// Public URL of a distributed image.
    fn distribution_url(&self, image_id: ImageId) -> String;
}

#[derive(Clone)]
pub struct S3ImageStore {
    client: Client,
    upload_bucket: String,
    distribution_bucket: String,
    presigning: PresigningConfig,
    public_base: String,
}

impl S3ImageStore {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let region = Region::new(cfg.region.clone());
        let client = match &cfg.endpoint {
            Some(endpoint) => {
                let shared = defaults(BehaviorVersion::latest())
                    .region(region)
                    .credentials_provider(Credentials::new(
                        &cfg.access_key,
                        &cfg.secret_key,
                        None,
                        None,
                        "static",
                    ))
                    .endpoint_url(endpoint)
                    .load()
                    .await;
                let conf = S3ConfigBuilder::from(&shared)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                Client::from_conf(conf)
            }
            None => {
                let shared = defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                Client::new(&shared)
            }
        };

        let upload_url_ttl = Duration::from_secs(cfg.upload_url_ttl_secs);
        let presigning =
            PresigningConfig::expires_in(upload_url_ttl).context("invalid UPLOAD_URL_TTL_SECONDS")?;

        tracing::info!(
            upload_bucket = %cfg.upload_bucket,
            distribution_bucket = %cfg.distribution_bucket,
            endpoint = cfg.endpoint.as_deref().unwrap_or("aws"),
            "s3 image store ready"
        );

        Ok(Self {
            client,
            upload_bucket: cfg.upload_bucket.clone(),
            distribution_bucket: cfg.distribution_bucket.clone(),
            presigning,
            public_base: public_base_url(cfg)?,
        })
    }
}

/// CDN domain when configured, else the path-style bucket URL on the custom endpoint.
pub fn public_base_url(cfg: &StorageConfig) -> anyhow::Result<String> {
    if let Some(domain) = &cfg.distribution_domain {
        let domain = domain.trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            return Ok(domain.to_string());
        }
        return Ok(format!("https://{domain}"));
    }
    let endpoint = cfg
        .endpoint
        .as_deref()
        .context("DISTRIBUTION_DOMAIN or S3_ENDPOINT must be set")?;
    Ok(format!("{}/{}", endpoint, cfg.distribution_bucket))
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn presign_upload(&self, image_id: ImageId) -> anyhow::Result<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.upload_bucket)
            .key(image_id.to_string())
            .presigned(self.presigning.clone())
            .await
            .context("s3 presign put_object")?;
        Ok(presigned.uri().to_string())
    }

    async fn copy_to_distribution(&self, image_id: ImageId) -> anyhow::Result<()> {
        let key = image_id.to_string();
        self.client
            .copy_object()
            .copy_source(format!("{}/{}", self.upload_bucket, key))
            .bucket(&self.distribution_bucket)
            .key(&key)
            .send()
            .await
            .with_context(|| format!("s3 copy_object {key}"))?;
        tracing::debug!(%image_id, "image copied to distribution bucket");
        Ok(())
    }

    fn distribution_url(&self, image_id: ImageId) -> String {
        format!("{}/{}", self.public_base, image_id)
    }
}
