use crate::{config::StorageConfig, error::SignError};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    presigning::PresigningConfig,
    Client,
};
use std::time::Duration;

/// Produces a write-scoped, time-limited url for one object.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, SignError>;
}

/// Presigns `PutObject` requests against an S3-compatible endpoint (R2 by default).
#[derive(Debug, Clone)]
pub struct S3Signer {
    client: Client,
}

impl S3Signer {
    pub fn new(client: Client) -> Self {
        S3Signer { client }
    }

    /// Builds a client from static credentials. Absent fields are left empty; the issuer
    /// refuses incomplete configuration before any signing happens.
    pub fn from_config(cfg: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            cfg.access_key_id.clone().unwrap_or_default(),
            cfg.secret_access_key.clone().unwrap_or_default(),
            None,
            None,
            "storage-config",
        );
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .credentials_provider(credentials)
            .force_path_style(true);

        if let Some(endpoint) = &cfg.account_endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        S3Signer::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl Signer for S3Signer {
    async fn sign(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, SignError> {
        let presigned = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(ttl)?)
            .await?;

        Ok(presigned.uri().to_string())
    }
}
