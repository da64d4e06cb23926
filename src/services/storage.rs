use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{AppConfig, CloudinaryConfig, StorageBackend};
use crate::errors::{ApiError, ApiResult};
use crate::services::FileKind;

/// Where an uploaded blob ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Public URL handed to clients
    pub url: String,
    /// Backend specific key used for deletion
    pub key: String,
}

/// Blob storage for listing images, print documents and payment proofs
#[derive(Debug, Clone)]
pub enum BlobStore {
    Local(LocalStore),
    Cloudinary(CloudinaryStore),
}

impl BlobStore {
    pub fn from_config(config: &AppConfig) -> ApiResult<Self> {
        match config.storage_backend {
            StorageBackend::Local => Ok(BlobStore::Local(LocalStore::new(
                &config.upload_dir,
                &config.public_base_url,
            ))),
            StorageBackend::Cloudinary => {
                let creds = config.cloudinary.clone().ok_or_else(|| {
                    ApiError::internal("STORAGE_BACKEND=cloudinary requires CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET")
                })?;
                Ok(BlobStore::Cloudinary(CloudinaryStore::new(creds)))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            BlobStore::Local(_) => "local",
            BlobStore::Cloudinary(_) => "cloudinary",
        }
    }

    pub async fn put(&self, folder: &str, kind: FileKind, original_name: &str, data: Vec<u8>) -> ApiResult<StoredFile> {
        let size = data.len();
        let stored = match self {
            BlobStore::Local(store) => store.put(folder, kind, original_name, data).await?,
            BlobStore::Cloudinary(store) => store.put(folder, kind, original_name, data).await?,
        };
        log::info!("Stored {} ({} bytes) as {}", original_name, size, stored.key);
        Ok(stored)
    }

    pub async fn delete(&self, key: &str) -> ApiResult<()> {
        match self {
            BlobStore::Local(store) => store.delete(key).await,
            BlobStore::Cloudinary(store) => store.delete(key).await,
        }
    }

    /// Delete and only log failures; used when rolling back a half-finished request
    pub async fn delete_quietly(&self, key: &str) {
        if key.is_empty() {
            return;
        }
        if let Err(e) = self.delete(key).await {
            log::warn!("Failed to delete stored file {}: {}", key, e);
        }
    }
}

/// Files on disk under `UPLOAD_DIR/<folder>/<uuid>.<ext>`, served from `/uploads`
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    public_base_url: String,
}

/// A single path segment without separators or dot prefixes
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>, public_base_url: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve `<folder>/<file>` inside the upload root, `None` for anything that could escape it
    pub fn resolve(&self, folder: &str, file: &str) -> Option<PathBuf> {
        if is_safe_segment(folder) && is_safe_segment(file) {
            Some(self.root.join(folder).join(file))
        } else {
            None
        }
    }

    fn resolve_key(&self, key: &str) -> Option<PathBuf> {
        let (folder, file) = key.split_once('/')?;
        self.resolve(folder, file)
    }

    pub async fn put(&self, folder: &str, kind: FileKind, original_name: &str, data: Vec<u8>) -> ApiResult<StoredFile> {
        let file_name = format!("{}.{}", Uuid::new_v4().simple(), kind.extension(original_name));
        let path = self
            .resolve(folder, &file_name)
            .ok_or_else(|| ApiError::internal(format!("Invalid upload folder: {}", folder)))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;

        Ok(StoredFile {
            url: format!("{}/uploads/{}/{}", self.public_base_url, folder, file_name),
            key: format!("{}/{}", folder, file_name),
        })
    }

    pub async fn delete(&self, key: &str) -> ApiResult<()> {
        let path = self
            .resolve_key(key)
            .ok_or_else(|| ApiError::bad_request("Invalid storage key"))?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Signed uploads through the Cloudinary REST API
#[derive(Debug, Clone)]
pub struct CloudinaryStore {
    creds: CloudinaryConfig,
    client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
    resource_type: String,
}

#[derive(Debug, serde::Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorMessage,
}

#[derive(Debug, serde::Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

/// SHA-256 signature over the alphabetically sorted params followed by the secret
pub fn cloudinary_signature(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{:x}", Sha256::digest(format!("{}{}", to_sign, api_secret).as_bytes()))
}

fn unix_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

impl CloudinaryStore {
    pub fn new(creds: CloudinaryConfig) -> Self {
        Self {
            creds,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}/{}",
            self.creds.cloud_name, resource_type, action
        )
    }

    async fn upstream_error(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let message = match response.json::<CloudinaryErrorBody>().await {
            Ok(body) => body.error.message,
            Err(_) => "no error body".to_string(),
        };
        ApiError::Upstream(format!("Cloudinary returned {}: {}", status, message))
    }

    pub async fn put(&self, folder: &str, kind: FileKind, original_name: &str, data: Vec<u8>) -> ApiResult<StoredFile> {
        let timestamp = unix_timestamp();
        let signature = cloudinary_signature(&[("folder", folder), ("timestamp", &timestamp)], &self.creds.api_secret);

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(format!("upload.{}", kind.extension(original_name)))
            .mime_str(kind.mime())?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.creds.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let uploaded: CloudinaryUploadResponse = response.json().await?;
        Ok(StoredFile {
            url: uploaded.secure_url,
            key: format!("{}:{}", uploaded.resource_type, uploaded.public_id),
        })
    }

    pub async fn delete(&self, key: &str) -> ApiResult<()> {
        let (resource_type, public_id) = key
            .split_once(':')
            .ok_or_else(|| ApiError::bad_request("Invalid storage key"))?;

        let timestamp = unix_timestamp();
        let signature = cloudinary_signature(&[("public_id", public_id), ("timestamp", &timestamp)], &self.creds.api_secret);

        let response = self
            .client
            .post(self.endpoint(resource_type, "destroy"))
            .form(&[
                ("public_id", public_id),
                ("api_key", self.creds.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> LocalStore {
        let root = std::env::temp_dir().join(format!("printkart-store-{}", Uuid::new_v4().simple()));
        LocalStore::new(root, "http://localhost:5000/")
    }

    #[test]
    fn test_unix_timestamp_is_seconds() {
        let ts: i64 = unix_timestamp().parse().unwrap();
        let now = chrono::Utc::now().timestamp();
        assert!((now - ts).abs() <= 1);
        assert!(ts > 1_600_000_000);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = temp_store();
        assert!(store.resolve("sellbooks", "a.png").is_some());
        assert!(store.resolve("..", "passwd").is_none());
        assert!(store.resolve("sellbooks", "../../etc/passwd").is_none());
        assert!(store.resolve("sellbooks", ".env").is_none());
        assert!(store.resolve("sell/books", "a.png").is_none());
        assert!(store.resolve("", "a.png").is_none());
    }

    #[tokio::test]
    async fn test_local_put_and_delete() {
        let store = temp_store();
        let stored = store
            .put("prints", FileKind::Pdf, "notes.pdf", b"%PDF-1.4 test".to_vec())
            .await
            .unwrap();

        assert!(stored.url.starts_with("http://localhost:5000/uploads/prints/"));
        assert!(stored.key.starts_with("prints/") && stored.key.ends_with(".pdf"));

        let (folder, file) = stored.key.split_once('/').unwrap();
        let path = store.resolve(folder, file).unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4 test");

        store.delete(&stored.key).await.unwrap();
        assert!(!path.exists());
        // Deleting twice is fine
        store.delete(&stored.key).await.unwrap();
    }

    #[test]
    fn test_cloudinary_signature_sorts_params() {
        let a = cloudinary_signature(&[("timestamp", "1315060510"), ("folder", "sellbooks")], "secret");
        let b = cloudinary_signature(&[("folder", "sellbooks"), ("timestamp", "1315060510")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let expected = format!(
            "{:x}",
            Sha256::digest(b"folder=sellbooks&timestamp=1315060510secret")
        );
        assert_eq!(a, expected);
    }
}
