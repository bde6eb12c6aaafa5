use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};
use uuid::Uuid;

use configs::CloudinaryConfig;

use crate::errors::ServiceError;

/// Url prefix the local store's files are served under.
pub const LOCAL_PUBLIC_PREFIX: &str = "/uploads";

// No SVG: local files are served same-origin, and SVG can carry script.
const ALLOWED_TYPES: [&str; 5] = ["image/jpeg", "image/png", "image/gif", "image/webp", "application/pdf"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
    pub bytes: usize,
}

/// Why an upload is refused before it reaches a store.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadRejection {
    Empty,
    TooLarge { limit: usize },
    UnsupportedType(String),
}

pub fn check_upload(content_type: &str, len: usize, max_bytes: usize) -> Result<(), UploadRejection> {
    if len == 0 {
        return Err(UploadRejection::Empty);
    }
    if len > max_bytes {
        return Err(UploadRejection::TooLarge { limit: max_bytes });
    }
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if !ALLOWED_TYPES.contains(&essence.as_str()) {
        return Err(UploadRejection::UnsupportedType(essence));
    }
    Ok(())
}

fn extension_for(content_type: &str, file_name: &str) -> String {
    match content_type {
        "image/jpeg" => "jpg".into(),
        "image/png" => "png".into(),
        "image/gif" => "gif".into(),
        "image/webp" => "webp".into(),
        "application/pdf" => "pdf".into(),
        _ => Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin")
            .to_ascii_lowercase(),
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file_name: &str, content_type: &str, data: Vec<u8>) -> Result<StoredMedia, ServiceError>;
}

/// Writes files under a directory served at `/uploads`.
pub struct LocalMediaStore {
    dir: PathBuf,
}

impl LocalMediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn upload(&self, file_name: &str, content_type: &str, data: Vec<u8>) -> Result<StoredMedia, ServiceError> {
        let public_id = format!("{}.{}", Uuid::new_v4().simple(), extension_for(content_type, file_name));
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ServiceError::Integration(format!("cannot prepare upload dir: {e}")))?;
        let bytes = data.len();
        tokio::fs::write(self.dir.join(&public_id), data)
            .await
            .map_err(|e| ServiceError::Integration(format!("cannot store upload: {e}")))?;
        info!(public_id = %public_id, bytes, "media_stored_locally");
        Ok(StoredMedia { url: format!("{LOCAL_PUBLIC_PREFIX}/{public_id}"), public_id, bytes })
    }
}

/// Signed uploads to Cloudinary.
pub struct CloudinaryStore {
    client: reqwest::Client,
    cfg: CloudinaryConfig,
}

impl CloudinaryStore {
    pub fn new(client: reqwest::Client, cfg: CloudinaryConfig) -> Self { Self { client, cfg } }
}

/// SHA-256 over the `&`-joined, key-sorted params followed by the secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    bytes: usize,
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn upload(&self, file_name: &str, content_type: &str, data: Vec<u8>) -> Result<StoredMedia, ServiceError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let folder = self.cfg.folder.clone().unwrap_or_default();
        let signature = sign_params(&[("folder", folder.clone()), ("timestamp", timestamp.clone())], &self.cfg.api_secret);

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| ServiceError::Integration(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.cfg.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        if !folder.is_empty() {
            form = form.text("folder", folder);
        }

        let endpoint = format!("https://api.cloudinary.com/v1_1/{}/auto/upload", self.cfg.cloud_name);
        let resp = self
            .client
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::Integration(format!("cloudinary request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Integration(format!("cloudinary upload failed: {status} - {body}")));
        }
        let body: CloudinaryResponse = resp
            .json()
            .await
            .map_err(|e| ServiceError::Integration(format!("cloudinary response invalid: {e}")))?;
        info!(public_id = %body.public_id, bytes = body.bytes, "media_uploaded");
        Ok(StoredMedia { url: body.secure_url, public_id: body.public_id, bytes: body.bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_checks() {
        assert!(check_upload("image/png", 10, 100).is_ok());
        assert!(check_upload("application/pdf; charset=binary", 10, 100).is_ok());
        assert_eq!(check_upload("image/png", 101, 100), Err(UploadRejection::TooLarge { limit: 100 }));
        assert_eq!(check_upload("text/html", 10, 100), Err(UploadRejection::UnsupportedType("text/html".into())));
        assert_eq!(check_upload("image/png", 0, 100), Err(UploadRejection::Empty));
    }

    #[test]
    fn svg_is_refused() {
        assert_eq!(check_upload("image/svg+xml", 10, 100), Err(UploadRejection::UnsupportedType("image/svg+xml".into())));
        assert_eq!(check_upload("Image/SVG+XML; charset=utf-8", 10, 100), Err(UploadRejection::UnsupportedType("image/svg+xml".into())));
    }

    #[test]
    fn signature_sorts_params_and_skips_empty() {
        let a = sign_params(&[("timestamp", "1700000000".into()), ("folder", "clinics".into())], "secret");
        let b = sign_params(&[("folder", "clinics".into()), ("timestamp", "1700000000".into())], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let no_folder = sign_params(&[("folder", String::new()), ("timestamp", "1700000000".into())], "secret");
        let mut hasher = Sha256::new();
        hasher.update(b"timestamp=1700000000secret");
        assert_eq!(no_folder, hex::encode(hasher.finalize()));
    }

    #[tokio::test]
    async fn local_store_writes_file() {
        let dir = std::env::temp_dir().join(format!("media-test-{}", Uuid::new_v4().simple()));
        let store = LocalMediaStore::new(&dir);
        let stored = store.upload("scan.PDF", "application/pdf", b"%PDF-1.4".to_vec()).await.unwrap();
        assert!(stored.url.starts_with("/uploads/"));
        assert!(stored.public_id.ends_with(".pdf"));
        assert_eq!(stored.bytes, 8);
        let on_disk = tokio::fs::read(dir.join(&stored.public_id)).await.unwrap();
        assert_eq!(on_disk, b"%PDF-1.4");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
