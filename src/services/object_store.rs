//! Object-store access: presigned download URLs and uploads.
//!
//! Only the S3-compatible backend exists. Presigning is computed locally from
//! the credentials and never touches the network; `put` does.

use crate::config::AppConfig;
use async_trait::async_trait;
use bytes::Bytes;
use s3::{bucket::Bucket, creds::Credentials, region::Region};
use std::time::Duration;
use thiserror::Error;

/// S3 rejects presigned URLs valid for longer than seven days.
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object store configuration invalid: {0}")]
    Config(String),
    #[error("failed to presign `{key}`: {reason}")]
    Presign { key: String, reason: String },
    #[error("failed to upload `{key}`: {reason}")]
    Upload { key: String, reason: String },
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Mint a GET URL for `key` valid for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> ObjectStoreResult<String>;

    /// Store `content` under `key`.
    async fn put(&self, key: &str, content: Bytes) -> ObjectStoreResult<()>;
}

/// Connection settings for [`S3ObjectStore`].
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Storage-internal endpoint; path-style addressing is used against it.
    pub endpoint: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl From<&AppConfig> for S3Config {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            bucket: cfg.s3_bucket.clone(),
            region: cfg.s3_region.clone(),
            endpoint: cfg.s3_url.clone(),
            access_key_id: cfg.s3_access_key_id.clone(),
            secret_access_key: cfg.s3_secret_access_key.clone(),
        }
    }
}

/// S3-compatible store (AWS, MinIO, LocalStack).
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> ObjectStoreResult<Self> {
        // Static keys when both halves are configured, otherwise the default chain:
        // env vars -> ~/.aws/credentials -> instance metadata.
        let credentials = match (&config.access_key_id, &config.secret_access_key) {
            (Some(ak), Some(sk)) => {
                Credentials::new(Some(ak.as_str()), Some(sk.as_str()), None, None, None)
            }
            _ => Credentials::default().or_else(|e| {
                tracing::warn!(
                    "No S3 credentials found ({}); signing anonymously, access URLs will fail \
                     until DRS_S3_ACCESS_KEY_ID and DRS_S3_SECRET_ACCESS_KEY are set",
                    e
                );
                Credentials::anonymous()
            }),
        }
        .map_err(|e| ObjectStoreError::Config(format!("failed to load S3 credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        };

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| ObjectStoreError::Config(format!("failed to create S3 bucket: {}", e)))?
            .with_path_style();

        tracing::info!(
            bucket = %config.bucket,
            endpoint = %config.endpoint,
            "S3 object store configured"
        );

        Ok(Self { bucket })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_get(&self, key: &str, expires_in: Duration) -> ObjectStoreResult<String> {
        let expiry_secs = expires_in.min(MAX_PRESIGN_EXPIRY).as_secs() as u32;

        let url = self
            .bucket
            .presign_get(key, expiry_secs, None)
            .await
            .map_err(|e| ObjectStoreError::Presign {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(key = %key, expires_in_secs = expiry_secs, "generated S3 presigned URL");
        Ok(url)
    }

    async fn put(&self, key: &str, content: Bytes) -> ObjectStoreResult<()> {
        let response = self
            .bucket
            .put_object(key, &content)
            .await
            .map_err(|e| ObjectStoreError::Upload {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if !(200..300).contains(&response.status_code()) {
            return Err(ObjectStoreError::Upload {
                key: key.to_string(),
                reason: format!("status {}", response.status_code()),
            });
        }

        tracing::debug!(key = %key, size = content.len(), "S3 put object successful");
        Ok(())
    }
}

/// Replace the storage-internal prefix of `url` with the public one.
///
/// URLs that do not start with `internal` are returned unchanged.
pub fn rewrite_public_url(url: &str, internal: &str, public: &str) -> String {
    let internal = internal.trim_end_matches('/');
    let public = public.trim_end_matches('/');
    if internal.is_empty() {
        return url.to_string();
    }

    match url.strip_prefix(internal) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') => {
            format!("{}{}", public, rest)
        }
        _ => {
            tracing::warn!(url = %url, internal = %internal, "presigned URL has unexpected host");
            url.to_string()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn local_store() -> S3ObjectStore {
        S3ObjectStore::new(S3Config {
            bucket: "test".into(),
            region: "us-east-1".into(),
            endpoint: "http://s3-localstack:4566".into(),
            access_key_id: Some("test".into()),
            secret_access_key: Some("test".into()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn presigns_path_style_url_for_key() {
        let url = local_store()
            .presign_get("Test1.txt", Duration::from_secs(86_400))
            .await
            .unwrap();

        assert!(url.starts_with("http://s3-localstack:4566/test/Test1.txt?"));
        assert!(url.contains("X-Amz-Expires=86400"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn expiry_is_capped_at_seven_days() {
        let url = local_store()
            .presign_get("big", Duration::from_secs(30 * 24 * 60 * 60))
            .await
            .unwrap();

        assert!(url.contains("X-Amz-Expires=604800"));
    }

    #[test]
    fn rewrites_internal_prefix() {
        assert_eq!(
            rewrite_public_url(
                "http://s3-localstack:4566/test/a.txt?X-Amz-Signature=abc",
                "http://s3-localstack:4566/",
                "http://localhost:4566",
            ),
            "http://localhost:4566/test/a.txt?X-Amz-Signature=abc"
        );
    }

    #[test]
    fn leaves_foreign_and_lookalike_hosts_alone() {
        assert_eq!(
            rewrite_public_url("https://other/x", "http://s3-localstack:4566", "http://pub"),
            "https://other/x"
        );
        assert_eq!(
            rewrite_public_url(
                "http://s3-localstack:45660/x",
                "http://s3-localstack:4566",
                "http://pub"
            ),
            "http://s3-localstack:45660/x"
        );
    }
}
