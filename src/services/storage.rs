use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

/// File uploads for cover images, client logos and portfolio pictures.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` and returns the public URL of the stored object.
    async fn upload(&self, bucket: &str, file_name: &str, bytes: &[u8]) -> anyhow::Result<String>;
}

/// Writes uploads under `root/<bucket>/`, served from `/uploads`.
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, bucket: &str, file_name: &str, bytes: &[u8]) -> anyhow::Result<String> {
        if !is_valid_bucket(bucket) {
            anyhow::bail!("invalid bucket name: {bucket}");
        }

        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create bucket directory {}", dir.display()))?;

        let object_name = format!("{}-{}", uuid::Uuid::new_v4(), sanitize_file_name(file_name));
        let path = dir.join(&object_name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write upload {}", path.display()))?;

        tracing::info!(bucket, object = %object_name, size = bytes.len(), "stored upload");
        Ok(format!("{}/uploads/{bucket}/{object_name}", self.public_base_url))
    }
}

pub fn is_valid_bucket(bucket: &str) -> bool {
    !bucket.is_empty()
        && bucket.len() <= 63
        && bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Keeps the last path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
