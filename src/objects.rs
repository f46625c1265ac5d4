//! Object storage contract used for uploaded images and font files.
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use log::{debug, error, info};
use url::Url;

use crate::{PrepaseError, Result};

/// Blob storage with public URLs. Uploads never overwrite.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` at `path`. Fails with [`PrepaseError::ObjectExists`] if
    /// the path is taken.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Public URL under which `path` is served
    fn public_url(&self, path: &str) -> Result<Url>;
}

/// Decodes a base64 payload, uploads it and returns its public URL
pub async fn upload_base64(
    store: &dyn ObjectStore,
    path: &str,
    payload: &str,
    content_type: &str,
) -> Result<Url> {
    let bytes = STANDARD.decode(payload.trim()).map_err(|e| {
        error!("Failed to decode base64 upload for {}: {}", path, e);
        PrepaseError::Decode(e)
    })?;
    upload_bytes(store, path, bytes, content_type).await
}

/// Uploads raw bytes and returns their public URL
pub async fn upload_bytes(
    store: &dyn ObjectStore,
    path: &str,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<Url> {
    debug!("Uploading {} bytes to {} as {}", bytes.len(), path, content_type);
    store.upload(path, bytes, content_type).await?;
    let url = store.public_url(path)?;
    info!("Uploaded {}", url);
    Ok(url)
}

/// Object name unlikely to collide: `{prefix}_{millis}_{random}.{ext}`
pub fn unique_object_name(prefix: &str, extension: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}.{}",
        prefix,
        Utc::now().timestamp_millis(),
        &random[..8],
        extension.trim_start_matches('.')
    )
}

fn checked_object_path(path: &str) -> Result<&str> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(|part| part.is_empty() || part == "..") {
        return Err(PrepaseError::validation(format!(
            "Invalid object path: {}",
            path
        )));
    }
    Ok(trimmed)
}

fn join_public(base: &Url, bucket: &str, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(&format!("{}/{}", bucket, path))
        .map_err(|e| PrepaseError::ConfigError {
            message: format!("Cannot build public URL for {}: {}", path, e),
        })
}

/// Object store writing into `<root>/<bucket>/<path>` on the local disk.
#[derive(Debug, Clone)]
pub struct FileObjectStore {
    root: PathBuf,
    bucket: String,
    public_base: Url,
}

impl FileObjectStore {
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>, public_base: Url) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            public_base,
        }
    }

    fn object_file(&self, path: &str) -> Result<PathBuf> {
        let path = checked_object_path(path)?;
        Ok(path
            .split('/')
            .fold(self.root.join(&self.bucket), |dir, part| dir.join(part)))
    }
}

#[async_trait]
impl ObjectStore for FileObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let file = self.object_file(path)?;
        if file.exists() {
            error!("Refusing to overwrite existing object {}", file.display());
            return Err(PrepaseError::ObjectExists {
                path: path.to_string(),
            });
        }
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                error!("Failed to create directory {}: {}", parent.display(), e);
                PrepaseError::DirectoryError {
                    path: parent.to_path_buf(),
                }
            })?;
        }
        debug!("Writing {} object to {}", content_type, file.display());
        fs::write(&file, bytes)?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> Result<Url> {
        join_public(&self.public_base, &self.bucket, checked_object_path(path)?)
    }
}

/// Stored object as kept by [`MemoryObjectStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store for tests
#[derive(Debug, Clone)]
pub struct MemoryObjectStore {
    bucket: String,
    public_base: Url,
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>, public_base: Url) -> Self {
        Self {
            bucket: bucket.into(),
            public_base,
            objects: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get(&self, path: &str) -> Option<StoredObject> {
        let path = checked_object_path(path).ok()?;
        self.objects.lock().ok()?.get(path).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let path = checked_object_path(path)?;
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| PrepaseError::LockAcquisitionFailed {
                message: "Failed to acquire lock on object store".to_string(),
            })?;
        if objects.contains_key(path) {
            return Err(PrepaseError::ObjectExists {
                path: path.to_string(),
            });
        }
        objects.insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> Result<Url> {
        join_public(&self.public_base, &self.bucket, checked_object_path(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base() -> Url {
        Url::parse("https://cdn.example.test/storage/v1/object/public").unwrap()
    }

    #[tokio::test]
    async fn base64_uploads_are_decoded_before_storing() {
        let store = MemoryObjectStore::new("images", base());

        let url = upload_base64(&store, "scan.png", "aGVsbG8=", "image/png")
            .await
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://cdn.example.test/storage/v1/object/public/images/scan.png"
        );
        let stored = store.get("scan.png").unwrap();
        assert_eq!(stored.bytes, b"hello");
        assert_eq!(stored.content_type, "image/png");
    }

    #[tokio::test]
    async fn invalid_base64_is_rejected() {
        let store = MemoryObjectStore::new("images", base());
        let result = upload_base64(&store, "scan.png", "***", "image/png").await;
        assert!(matches!(result, Err(PrepaseError::Decode(_))));
        assert!(store.get("scan.png").is_none());
    }

    #[tokio::test]
    async fn uploads_never_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = FileObjectStore::new(dir.path(), "fonts", base());

        store.upload("a/b.ttf", vec![1, 2], "font/ttf").await.unwrap();
        let again = store.upload("a/b.ttf", vec![3], "font/ttf").await;

        assert!(matches!(again, Err(PrepaseError::ObjectExists { .. })));
        assert_eq!(
            fs::read(dir.path().join("fonts").join("a").join("b.ttf")).unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn traversal_paths_are_rejected() {
        let store = MemoryObjectStore::new("images", base());
        assert!(store.public_url("../etc/passwd").is_err());
        assert!(store.public_url("").is_err());
    }

    #[test]
    fn unique_names_keep_prefix_and_extension() {
        let name = unique_object_name("image", ".png");
        assert!(name.starts_with("image_"));
        assert!(name.ends_with(".png"));
        assert_ne!(name, unique_object_name("image", "png"));
    }
}
