//! Wire types shared by the backend and the editor client.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Template used for the printable export when none is chosen.
pub const DEFAULT_EXPORT_TEMPLATE: &str = "europass";

/// `GET /api/markdown` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownDocument {
    pub content: String,
}

/// `POST /api/markdown` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMarkdown {
    pub markdown: String,
}

/// Generic `{status}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub status: String,
}

impl Status {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

/// Error body returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// A CV template as listed by `GET /api/templates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub paper_sizes: Vec<String>,
    #[serde(default)]
    pub recommended_fonts: Vec<String>,
}

impl TemplateInfo {
    /// Entry listed when no template is installed.
    pub fn fallback() -> Self {
        Self {
            id: "default".to_string(),
            name: "Default".to_string(),
            description: "Default CV template".to_string(),
            paper_sizes: vec!["a4".to_string(), "letter".to_string()],
            recommended_fonts: vec![
                "DejaVu Sans".to_string(),
                "Helvetica".to_string(),
                "Arial".to_string(),
            ],
        }
    }
}

/// `POST /api/images/upload` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: String,
    pub url: String,
    pub alt_text: String,
}

/// An entry of `GET /api/images`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    pub url: String,
    pub alt_text: String,
    pub created_at: String,
    #[serde(default)]
    pub x_offset: i32,
    #[serde(default)]
    pub y_offset: i32,
}

/// Query of `POST /api/images/{id}/position`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePosition {
    #[serde(default)]
    pub x_offset: i32,
    #[serde(default)]
    pub y_offset: i32,
}

/// Query of `GET /api/pdf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportParams {
    #[serde(default = "default_template_id")]
    pub template_id: String,
    #[serde(default)]
    pub paper_size: PaperSize,
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            template_id: default_template_id(),
            paper_size: PaperSize::default(),
            theme_color: default_theme_color(),
        }
    }
}

fn default_template_id() -> String {
    DEFAULT_EXPORT_TEMPLATE.to_string()
}

fn default_theme_color() -> String {
    "blue".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    #[default]
    A4,
    Letter,
}

impl PaperSize {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A4 => "a4",
            Self::Letter => "letter",
        }
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "letter" => Ok(Self::Letter),
            other => Err(format!("unknown paper size: {other}")),
        }
    }
}

/// Path the browser navigates to for the printable export.
pub fn export_path(template_id: &str, paper_size: PaperSize) -> String {
    format!("/api/pdf?template_id={template_id}&paper_size={paper_size}")
}
