use crate::{
    config::{GrantPolicy, StorageConfig},
    error::GrantError,
    signer::Signer,
};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>) -> Self {
        UploadRequest {
            file_name: Some(file_name.into()),
            content_type: content_type.map(str::to_string),
        }
    }
}

/// Signed upload target plus the url the object is readable at once uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    pub url: String,
    pub public_url: String,
    pub expires_in: u64,
}

/// Collapses whitespace runs into a single `-` so the name is safe in a key and a url.
pub fn sanitize_file_name(file_name: &str) -> String {
    file_name.split_whitespace().collect::<Vec<_>>().join("-")
}

/// `<prefix>/<unix_millis>_<name>`, or `<unix_millis>_<name>` without a prefix.
pub fn object_key(prefix: &str, unix_millis: u128, sanitized_name: &str) -> String {
    if prefix.is_empty() {
        format!("{}_{}", unix_millis, sanitized_name)
    } else {
        format!("{}/{}_{}", prefix, unix_millis, sanitized_name)
    }
}

pub async fn issue_upload_grant<S: Signer + ?Sized>(
    request: &UploadRequest,
    cfg: &StorageConfig,
    policy: &GrantPolicy,
    signer: &S,
) -> Result<UploadGrant, GrantError> {
    issue_upload_grant_at(request, cfg, policy, signer, SystemTime::now()).await
}

pub async fn issue_upload_grant_at<S: Signer + ?Sized>(
    request: &UploadRequest,
    cfg: &StorageConfig,
    policy: &GrantPolicy,
    signer: &S,
    issued_at: SystemTime,
) -> Result<UploadGrant, GrantError> {
    let file_name = request
        .file_name
        .as_deref()
        .map(sanitize_file_name)
        .filter(|name| !name.is_empty())
        .ok_or(GrantError::Validation)?;
    let storage = cfg.resolve()?;

    let unix_millis = issued_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let key = object_key(&policy.key_prefix, unix_millis, &file_name);
    let content_type = request
        .content_type
        .as_deref()
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    let url = signer
        .sign(storage.bucket_name, &key, content_type, policy.upload_ttl)
        .await
        .map_err(GrantError::Signing)?;

    tracing::info!(
        bucket = storage.bucket_name,
        key = key.as_str(),
        content_type,
        ttl = policy.upload_ttl.as_secs(),
        "issued upload grant"
    );

    Ok(UploadGrant {
        url,
        public_url: format!("{}/{}", storage.public_base_url, key),
        expires_in: policy.upload_ttl.as_secs(),
    })
}
