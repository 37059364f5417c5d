//! Local filesystem blob store for secondary-verification evidence.
//!
//! Implements the `BlobStore` trait from `toma5-core`. Images arrive as
//! `data:image/<fmt>;base64,<payload>` references and land at:
//! ```text
//! {base_dir}/secondary-verification/{uuid}.{ext}
//! ```
//! The returned URL is `{public_base_url}/secondary-verification/{uuid}.{ext}`.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use toma5_core::repository::blob::BlobStore;
use toma5_types::error::BlobError;
use tracing::debug;
use uuid::Uuid;

const FOLDER: &str = "secondary-verification";

/// Filesystem-backed evidence image store.
pub struct LocalBlobStore {
    base_dir: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(base_dir: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            base_dir,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }
}

/// Split a data URL into `(extension, base64 payload)`.
fn parse_data_url(raw: &str) -> Result<(&'static str, &str), BlobError> {
    let rest = raw
        .trim()
        .strip_prefix("data:image/")
        .ok_or_else(|| BlobError::InvalidImage("expected a data:image/...;base64 URL".to_string()))?;
    let (format, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| BlobError::InvalidImage("image must be base64 encoded".to_string()))?;
    let ext = match format.to_ascii_lowercase().as_str() {
        "png" => "png",
        "jpeg" | "jpg" => "jpg",
        "webp" => "webp",
        "gif" => "gif",
        other => {
            return Err(BlobError::InvalidImage(format!(
                "unsupported image format: {other}"
            )));
        }
    };
    Ok((ext, payload))
}

impl BlobStore for LocalBlobStore {
    async fn store_image(&self, raw: &str) -> Result<String, BlobError> {
        let (ext, payload) = parse_data_url(raw)?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| BlobError::InvalidImage(format!("cannot decode image: {e}")))?;
        if bytes.is_empty() {
            return Err(BlobError::InvalidImage("image is empty".to_string()));
        }

        let dir = self.base_dir.join(FOLDER);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BlobError::UploadFailed(format!("create {}: {e}", dir.display())))?;

        let name = format!("{}.{ext}", Uuid::now_v7());
        let path = dir.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| BlobError::UploadFailed(format!("write {}: {e}", path.display())))?;

        debug!(path = %path.display(), size = bytes.len(), "stored evidence image");
        Ok(format!("{}/{FOLDER}/{name}", self.public_base_url))
    }

    async fn delete_image(&self, url: &str) -> Result<(), BlobError> {
        let Some(name) = url
            .strip_prefix(self.public_base_url.as_str())
            .and_then(|rest| rest.strip_prefix(&format!("/{FOLDER}/")))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
        else {
            return Err(BlobError::InvalidImage(format!("not a stored image: {url}")));
        };
        let path = self.base_dir.join(FOLDER).join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "deleted evidence image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::UploadFailed(format!(
                "remove {}: {e}",
                path.display()
            ))),
        }
    }
}
