use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Document served when no CV has been written yet.
pub const DEFAULT_MARKDOWN: &str = "# Your CV\n\nStart editing your CV here!";

/// The CV source file, `<data_dir>/cv.md`.
#[derive(Debug, Clone)]
pub struct MarkdownStore {
    path: PathBuf,
}

impl MarkdownStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("cv.md"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the CV, creating it with the default document if missing.
    pub async fn load(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "creating default CV");
                self.save(DEFAULT_MARKDOWN).await?;
                Ok(DEFAULT_MARKDOWN.to_string())
            }
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        }
    }

    pub async fn save(&self, markdown: &str) -> Result<()> {
        tokio::fs::write(&self.path, markdown)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        tracing::info!(bytes = markdown.len(), "markdown saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_creates_default_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarkdownStore::new(dir.path());
        assert_eq!(store.load().await.unwrap(), DEFAULT_MARKDOWN);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("cv.md")).unwrap(),
            DEFAULT_MARKDOWN
        );
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarkdownStore::new(dir.path());
        store.save("# Jane\n").await.unwrap();
        assert_eq!(store.load().await.unwrap(), "# Jane\n");
    }

    #[tokio::test]
    async fn test_save_into_missing_dir_fails_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarkdownStore::new(&dir.path().join("missing"));
        let err = store.save("x").await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to write"));
    }
}
