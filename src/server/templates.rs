use std::path::{Path, PathBuf};

use crate::api::{DEFAULT_EXPORT_TEMPLATE, TemplateInfo};

/// Per-template metadata file.
const METADATA_FILE: &str = "metadata.json";
/// Per-template HTML file rendered by the exporter.
const TEMPLATE_FILE: &str = "template.html";

/// Templates installed under `<templates_dir>/<id>/`.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    dir: PathBuf,
}

impl TemplateCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Installed templates sorted by id, or the built-in fallback entry.
    ///
    /// Directories without readable metadata are skipped.
    pub async fn list(&self) -> Vec<TemplateInfo> {
        let mut templates = Vec::new();
        match tokio::fs::read_dir(&self.dir).await {
            Ok(mut entries) => {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let metadata = entry.path().join(METADATA_FILE);
                    if !is_dir(&entry.path()).await || !is_file(&metadata).await {
                        continue;
                    }
                    match read_metadata(&metadata).await {
                        Ok(info) => templates.push(info),
                        Err(err) => {
                            tracing::error!(path = %metadata.display(), "bad template metadata: {err:#}");
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(dir = %self.dir.display(), %err, "template directory unreadable");
            }
        }

        if templates.is_empty() {
            templates.push(TemplateInfo::fallback());
        }
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    /// HTML template file for `template_id`.
    ///
    /// An unknown template falls back to the default export template;
    /// `None` means no template HTML is installed for it.
    pub async fn resolve(&self, template_id: &str) -> Option<PathBuf> {
        let mut dir = self.template_dir(template_id);
        let found = match &dir {
            Some(dir) => is_dir(dir).await,
            None => false,
        };
        if !found {
            tracing::warn!(template_id, "template not found, using {DEFAULT_EXPORT_TEMPLATE}");
            dir = self.template_dir(DEFAULT_EXPORT_TEMPLATE);
        }
        let html = dir?.join(TEMPLATE_FILE);
        if is_file(&html).await {
            Some(html)
        } else {
            tracing::warn!(template_id, "template HTML not found");
            None
        }
    }

    /// Directory of a template; ids that are not a single path segment are rejected.
    fn template_dir(&self, template_id: &str) -> Option<PathBuf> {
        let valid = !template_id.is_empty()
            && template_id != "."
            && template_id != ".."
            && !template_id.contains(['/', '\\']);
        valid.then(|| self.dir.join(template_id))
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

async fn read_metadata(path: &Path) -> anyhow::Result<TemplateInfo> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}
