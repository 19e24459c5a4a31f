// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. server::ServerConfig)
    clippy::module_name_repetitions
)]

//! # markcv
//!
//! A markdown CV editor with live preview and a printable export.
//!
//! Image metadata (width, alignment, profile offsets) is stored inside the
//! alt text of markdown images, so the CV stays plain markdown:
//!
//! ```text
//! ![Jane Doe|width=150px|align=right](/data/images/2f1c.png)
//! ```
//!
//! ## Architecture
//!
//! The editor controller uses The Elm Architecture (TEA) pattern:
//! - **Model**: Editor state, including the image selection
//! - **Message**: Edits, clicks, toolbar actions and request completions
//! - **Update**: Pure state transitions
//! - **Effects**: Backend requests run as tokio tasks
//!
//! ## Modules
//!
//! - [`annotation`]: The alt-text annotation codec
//! - [`document`]: Image tokens and CV sections in the markdown source
//! - [`render`]: Markdown to HTML preview
//! - [`editor`]: Rope-backed source buffer
//! - [`app`]: Editor controller and image selection tracker
//! - [`client`]: HTTP client for the backend
//! - [`server`]: The axum backend
//! - [`api`]: Wire types shared by client and server
//! - [`config`]: Config files holding default flags

pub mod annotation;
pub mod api;
pub mod app;
pub mod client;
pub mod config;
pub mod document;
pub mod editor;
pub mod render;
pub mod server;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::annotation::{Align, AnnotationSet};
    pub use crate::app::{App, Message, Model};
    pub use crate::client::ApiClient;
    pub use crate::render::Preview;
}
