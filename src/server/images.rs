use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::api::{ImageInfo, ImagePosition, UploadedImage};
use crate::document::uploaded_image_url;

const METADATA_FILE: &str = "images_metadata.json";

/// One entry of the image metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredImage {
    id: String,
    #[serde(default)]
    original_name: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    alt_text: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    x_offset: i32,
    #[serde(default)]
    y_offset: i32,
}

impl StoredImage {
    fn info(&self) -> ImageInfo {
        ImageInfo {
            id: self.id.clone(),
            url: uploaded_image_url(&self.id),
            alt_text: self.alt_text.clone(),
            created_at: self.created_at.clone(),
            x_offset: self.x_offset,
            y_offset: self.y_offset,
        }
    }
}

/// Uploaded images in `<data_dir>/images` plus their metadata file.
///
/// Metadata updates are read-modify-write cycles and are serialized by
/// a lock.
#[derive(Debug)]
pub struct ImageStore {
    dir: PathBuf,
    metadata_path: PathBuf,
    lock: Mutex<()>,
}

impl ImageStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("images"),
            metadata_path: data_dir.join(METADATA_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store an uploaded image under a fresh `<uuid>.<ext>` id.
    pub async fn store(
        &self,
        file_name: &str,
        bytes: &[u8],
        alt_text: &str,
    ) -> Result<UploadedImage> {
        let id = format!("{}.{}", uuid::Uuid::new_v4(), extension_for(file_name, bytes));
        let path = self.dir.join(&id);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let record = StoredImage {
            id: id.clone(),
            original_name: file_name.to_string(),
            path: path.display().to_string(),
            alt_text: alt_text.to_string(),
            created_at: chrono::Local::now()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            x_offset: 0,
            y_offset: 0,
        };
        {
            let _guard = self.lock.lock().await;
            let mut records = self.read_metadata().await?;
            records.push(record);
            self.write_metadata(&records).await?;
        }

        tracing::info!(%id, original = file_name, bytes = bytes.len(), "image stored");
        Ok(UploadedImage {
            url: uploaded_image_url(&id),
            id,
            alt_text: alt_text.to_string(),
        })
    }

    pub async fn list(&self) -> Result<Vec<ImageInfo>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .read_metadata()
            .await?
            .iter()
            .map(StoredImage::info)
            .collect())
    }

    /// Record position offsets for an image. Returns `false` for unknown ids.
    pub async fn set_position(&self, id: &str, position: ImagePosition) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_metadata().await?;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        record.x_offset = position.x_offset;
        record.y_offset = position.y_offset;
        self.write_metadata(&records).await?;
        Ok(true)
    }

    /// Offsets recorded for an image, if it is known.
    pub async fn position(&self, id: &str) -> Result<Option<ImagePosition>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|image| image.id == id)
            .map(|image| ImagePosition {
                x_offset: image.x_offset,
                y_offset: image.y_offset,
            }))
    }

    /// Bytes of a stored image; `None` when missing or the id is not a plain file name.
    pub async fn read(&self, id: &str) -> Option<Vec<u8>> {
        if id.is_empty() || id.contains(['/', '\\']) || id == ".." {
            return None;
        }
        tokio::fs::read(self.dir.join(id)).await.ok()
    }

    async fn read_metadata(&self) -> Result<Vec<StoredImage>> {
        match tokio::fs::read_to_string(&self.metadata_path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Malformed {}", self.metadata_path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to read {}", self.metadata_path.display())),
        }
    }

    async fn write_metadata(&self, records: &[StoredImage]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&self.metadata_path, json)
            .await
            .with_context(|| format!("Failed to write {}", self.metadata_path.display()))
    }
}

/// Lowercased extension of the uploaded file name, or one guessed from
/// the image bytes.
fn extension_for(file_name: &str, bytes: &[u8]) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .or_else(|| {
            image::guess_format(bytes)
                .ok()
                .and_then(|format| format.extensions_str().first().copied())
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| "img".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[tokio::test]
    async fn test_store_writes_file_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let uploaded = store.store("Photo.PNG", PNG_MAGIC, "Me").await.unwrap();

        assert!(uploaded.id.ends_with(".png"));
        assert_eq!(uploaded.url, format!("/data/images/{}", uploaded.id));
        assert_eq!(uploaded.alt_text, "Me");
        assert!(dir.path().join("images").join(&uploaded.id).is_file());

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, uploaded.id);
        assert_eq!((listed[0].x_offset, listed[0].y_offset), (0, 0));
        assert!(!listed[0].created_at.is_empty());
    }

    #[tokio::test]
    async fn test_list_without_metadata_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageStore::new(dir.path()).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_position() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let uploaded = store.store("a.jpg", b"jpeg", "").await.unwrap();
        let position = ImagePosition {
            x_offset: 10,
            y_offset: -5,
        };

        assert!(store.set_position(&uploaded.id, position).await.unwrap());
        assert!(!store.set_position("nope.png", position).await.unwrap());
        assert_eq!(store.position(&uploaded.id).await.unwrap(), Some(position));
    }

    #[tokio::test]
    async fn test_read_rejects_path_segments() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let uploaded = store.store("a.png", PNG_MAGIC, "").await.unwrap();
        assert_eq!(store.read(&uploaded.id).await.as_deref(), Some(PNG_MAGIC));
        assert_eq!(store.read("../images_metadata.json").await, None);
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("me.JPG", b""), "jpg");
        assert_eq!(extension_for("me", PNG_MAGIC), "png");
        assert_eq!(extension_for("me", b"??"), "img");
    }
}
