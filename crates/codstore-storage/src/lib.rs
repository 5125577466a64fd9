//! S3-compatible object storage for uploaded images.
//!
//! Built against Cloudflare R2 but only assumes the S3 API: a custom
//! endpoint, one bucket, and a public base URL the CDN serves keys from.

use std::path::Path;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use codstore_core::app_config::StorageConfig;

const UPLOAD_PREFIX: &str = "uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object storage error: {0}")]
    Upload(String),
}

/// A stored object: the namespaced key and the public URL to serve it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Client for the configured bucket.
pub struct ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl ObjectStore {
    /// Builds a store from the app's storage settings.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "codstore",
        );
        let sdk_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Uploads one image under a namespaced key and returns its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Upload`] if the put fails.
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        original_name: &str,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let key = object_key(original_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        let url = format!("{}/{key}", self.public_base_url);
        Ok(StoredObject { key, url })
    }
}

/// Builds a collision-free key: `uploads/<unix-ms>-<uuid>-<sanitized-name><ext>`.
fn object_key(original_name: &str) -> String {
    let path = Path::new(original_name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or_else(|| ".jpg".to_string(), |e| format!(".{}", e.to_lowercase()));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");

    format!(
        "{UPLOAD_PREFIX}/{}-{}-{}{ext}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        sanitize_file_name(stem)
    )
}

/// Lowercases and strips anything outside `[a-z0-9.-_]`, collapsing runs of
/// hyphens and trimming them from the ends.
fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_hyphen = false;
    for c in name.to_lowercase().chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            c
        } else {
            '-'
        };
        if mapped == '-' {
            if last_hyphen {
                continue;
            }
            last_hyphen = true;
        } else {
            last_hyphen = false;
        }
        out.push(mapped);
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_and_collapses() {
        assert_eq!(sanitize_file_name("Photo Été (1)"), "photo-t-1");
        assert_eq!(sanitize_file_name("--promo--.v2--"), "promo-.v2");
        assert_eq!(sanitize_file_name("ok_name.jpg"), "ok_name.jpg");
        assert_eq!(sanitize_file_name("???"), "image");
    }

    #[test]
    fn object_key_is_namespaced_and_keeps_extension() {
        let key = object_key("Bannière Promo.PNG");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with(".png"));
        assert!(key.contains("banni-re-promo"));
    }

    #[test]
    fn object_key_defaults_missing_extension_to_jpg() {
        let key = object_key("rawfile");
        assert!(key.ends_with(".jpg"));
    }
}
