//! The markcv backend.
//!
//! Serves the CV source, the template catalog, image uploads and the
//! printable export over HTTP, plus the static frontend and the data
//! directory.

mod error;
pub mod export;
mod images;
mod routes;
mod store;
mod templates;

pub use error::ApiError;
pub use images::ImageStore;
pub use store::{DEFAULT_MARKDOWN, MarkdownStore};
pub use templates::TemplateCatalog;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Largest accepted image upload.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Holds `cv.md`, `cv.html`, `images/` and the image metadata
    pub data_dir: PathBuf,
    /// One directory per template, with `metadata.json` and `template.html`
    pub templates_dir: PathBuf,
    /// Frontend assets; `index.html` is served at `/`
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9876,
            data_dir: PathBuf::from("data"),
            templates_dir: PathBuf::from("cv_templates"),
            static_dir: PathBuf::from("static"),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub markdown: Arc<MarkdownStore>,
    pub templates: Arc<TemplateCatalog>,
    pub images: Arc<ImageStore>,
}

impl AppState {
    /// Create the state, making sure the data directories exist.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let images = ImageStore::new(&config.data_dir);
        std::fs::create_dir_all(images.dir())
            .with_context(|| format!("Failed to create {}", images.dir().display()))?;
        Ok(Self {
            markdown: Arc::new(MarkdownStore::new(&config.data_dir)),
            templates: Arc::new(TemplateCatalog::new(config.templates_dir.clone())),
            images: Arc::new(images),
            config: Arc::new(config),
        })
    }
}

/// Build the axum router with the API and static mounts
pub fn router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    Router::new()
        .route(
            "/api/markdown",
            get(routes::get_markdown).post(routes::save_markdown),
        )
        .route("/api/templates", get(routes::list_templates))
        .route(
            "/api/images/upload",
            post(routes::upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/images", get(routes::list_images))
        .route(
            "/api/images/{id}/position",
            post(routes::update_image_position),
        )
        .route("/api/pdf", get(routes::printable))
        .route_service("/", ServeFile::new(config.static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .nest_service("/data", ServeDir::new(&config.data_dir))
        .nest_service("/cv_templates", ServeDir::new(&config.templates_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until shutdown.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    state.markdown.load().await?;
    tracing::info!("Starting HTTP server on {addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> Result<()> {
    let addr = config.addr()?;
    let state = AppState::new(config)?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    serve(listener, state).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
