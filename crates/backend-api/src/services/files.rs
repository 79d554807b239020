//! Storage for uploaded avatar and cover images.
//!
//! Stored paths are relative to the store root, e.g. `avatars/<id>.png`.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use clinic_database::new_public_id;
use tracing::{debug, warn};

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `bytes` under `folder` and return the stored relative path.
    async fn save(&self, folder: &str, extension: &str, bytes: &[u8]) -> io::Result<String>;

    async fn remove(&self, path: &str) -> io::Result<()>;
}

/// Files on the local disk below a root directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> io::Result<PathBuf> {
        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || relative.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing stored path {}", relative.display()),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, folder: &str, extension: &str, bytes: &[u8]) -> io::Result<String> {
        let relative = format!("{folder}/{}.{extension}", new_public_id());
        let path = self.resolve(&relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %relative, size = bytes.len(), "stored upload");
        Ok(relative)
    }

    async fn remove(&self, path: &str) -> io::Result<()> {
        let absolute = self.resolve(path)?;
        match tokio::fs::remove_file(&absolute).await {
            Ok(()) => {
                debug!(path, "removed upload");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path, "upload already missing");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// Remove stored files, logging failures instead of returning them.
pub async fn remove_all(store: &dyn FileStore, paths: &[String]) {
    for path in paths {
        if let Err(error) = store.remove(path).await {
            warn!(path = %path, %error, "failed to remove stored file");
        }
    }
}

/// File extension for an accepted image content type.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_and_remove_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());

        let stored = store.save("avatars", "png", b"png-bytes").await.unwrap();
        assert!(stored.starts_with("avatars/"));
        assert!(stored.ends_with(".png"));
        assert_eq!(
            tokio::fs::read(dir.path().join(&stored)).await.unwrap(),
            b"png-bytes"
        );

        store.remove(&stored).await.unwrap();
        assert!(!dir.path().join(&stored).exists());

        // A second removal of the same file is not an error.
        store.remove(&stored).await.unwrap();
    }

    #[tokio::test]
    async fn paths_cannot_escape_the_root() {
        let dir = TempDir::new().unwrap();
        let store = LocalFileStore::new(dir.path());

        let err = store.remove("../secret.txt").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(store.remove("/etc/passwd").await.is_err());
    }

    #[test]
    fn only_images_are_accepted() {
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
    }
}
