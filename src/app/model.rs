use std::time::{Duration, Instant};

use crate::api::{DEFAULT_EXPORT_TEMPLATE, PaperSize, TemplateInfo};
use crate::editor::EditorBuffer;
use crate::render::Preview;

use super::selection::{SelectionState, Toolbar};

/// Content shown when the CV could not be loaded.
pub const LOAD_ERROR_PLACEHOLDER: &str =
    "# Error Loading Content\n\nThere was an error loading your content. Please try again.";

const TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// State of the image upload dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadDialog {
    pub visible: bool,
    pub alt_text: String,
    /// Percentage sent, while an upload is in flight.
    pub progress: Option<u8>,
}

impl UploadDialog {
    pub const fn in_flight(&self) -> bool {
        self.progress.is_some()
    }
}

/// The complete editor state.
///
/// All state lives here - no global or scattered state.
#[derive(Debug, Default)]
pub struct Model {
    /// Markdown source being edited
    pub buffer: EditorBuffer,
    /// Latest installed render of the buffer
    pub preview: Preview,
    /// Set when the buffer changed and the preview must be re-rendered
    pub(super) render_requested: bool,
    pub selection: SelectionState,
    pub toolbar: Toolbar,
    /// Origin the preview is served from, stripped from image srcs
    pub page_origin: String,
    /// Whether the initial load is still running
    pub loading: bool,
    /// Why the last load failed; the buffer then holds a placeholder
    pub load_error: Option<String>,
    /// Text being saved, while a save is in flight
    pub(super) pending_save: Option<String>,
    pub templates: Vec<TemplateInfo>,
    pub template_id: Option<String>,
    pub paper_size: PaperSize,
    pub upload: UploadDialog,
    pub dark_mode: bool,
    /// Url the host page should open (printable export)
    pub navigate_to: Option<String>,
    toast: Option<Toast>,
}

impl Model {
    /// Create a model for a preview served from `page_origin`.
    pub fn new(page_origin: impl Into<String>) -> Self {
        Self {
            page_origin: page_origin.into(),
            ..Self::default()
        }
    }

    pub const fn is_saving(&self) -> bool {
        self.pending_save.is_some()
    }

    /// Template used for export.
    pub fn export_template(&self) -> &str {
        self.template_id.as_deref().unwrap_or(DEFAULT_EXPORT_TEMPLATE)
    }

    pub(super) fn request_render(&mut self) {
        self.render_requested = true;
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.show_toast_for(level, message, TOAST_DURATION);
    }

    pub(super) fn show_toast_for(
        &mut self,
        level: ToastLevel,
        message: impl Into<String>,
        duration: Duration,
    ) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + duration,
        });
    }

    pub fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }
}
