//! HTTP client for the backend API.

use futures_util::stream;
use reqwest::multipart::{Form, Part};
use thiserror::Error;

use crate::api::{
    MarkdownDocument, PaperSize, SaveMarkdown, TemplateInfo, UploadedImage, export_path,
};

/// Bytes per upload body chunk; progress is reported once per chunk.
const UPLOAD_CHUNK: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },
}

/// An image picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub alt_text: String,
}

/// Client for the markcv backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for a server such as `http://127.0.0.1:9876`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetch the current CV source.
    pub async fn load_markdown(&self) -> Result<String, ClientError> {
        let response = check(self.http.get(self.url("/api/markdown")).send().await?).await?;
        Ok(response.json::<MarkdownDocument>().await?.content)
    }

    /// Persist the CV source.
    pub async fn save_markdown(&self, markdown: &str) -> Result<(), ClientError> {
        let body = SaveMarkdown {
            markdown: markdown.to_string(),
        };
        check(
            self.http
                .post(self.url("/api/markdown"))
                .json(&body)
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    pub async fn list_templates(&self) -> Result<Vec<TemplateInfo>, ClientError> {
        let response = check(self.http.get(self.url("/api/templates")).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Upload an image, calling `on_progress` with a percentage as the body
    /// is sent.
    pub async fn upload_image<F>(
        &self,
        upload: UploadRequest,
        on_progress: F,
    ) -> Result<UploadedImage, ClientError>
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        let total = upload.bytes.len();
        let chunks: Vec<Vec<u8>> = upload
            .bytes
            .chunks(UPLOAD_CHUNK)
            .map(<[u8]>::to_vec)
            .collect();

        let mut sent = 0usize;
        let body = stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len();
            on_progress(percent(sent, total));
            Ok::<_, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body), total as u64)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let form = Form::new()
            .part("file", part)
            .text("alt_text", upload.alt_text);

        let response = check(
            self.http
                .post(self.url("/api/images/upload"))
                .multipart(form)
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    /// Absolute url of the printable export.
    pub fn export_url(&self, template_id: &str, paper_size: PaperSize) -> String {
        self.url(&export_path(template_id, paper_size))
    }

    /// Download the printable export.
    pub async fn export(
        &self,
        template_id: &str,
        paper_size: PaperSize,
    ) -> Result<String, ClientError> {
        let response = check(
            self.http
                .get(self.export_url(template_id, paper_size))
                .send()
                .await?,
        )
        .await?;
        Ok(response.text().await?)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) * 100) / total) as u8
}
