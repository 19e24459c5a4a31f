use std::time::Duration;

use crate::annotation::{self, Align};
use crate::api::{PaperSize, TemplateInfo, UploadedImage, export_path};
use crate::client::UploadRequest;
use crate::document::{image_markdown, uploaded_image_url};
use crate::render::Preview;

use super::model::{LOAD_ERROR_PLACEHOLDER, UploadDialog};
use super::selection::{ClickTarget, OffsetAxis, normalize_width};
use super::{Model, ToastLevel};

const SAVED_TOAST: Duration = Duration::from_secs(2);

/// All possible events and actions of the editor.
///
/// These represent user input, completions of background requests, and
/// internal actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    // Editing
    /// The editor content changed
    EditorChanged(String),
    /// Move cursor to absolute position (line, col)
    EditorMoveTo(usize, usize),
    /// Put the cursor on an empty line after the content
    EditorOpenLineAtEnd,
    /// A render pass of the buffer finished
    RenderCompleted(Preview),

    // Image formatting
    /// Click inside the preview pane
    PreviewClick(ClickTarget),
    /// Set the alignment of the selected image
    AlignImage(Align),
    /// Set the width of the selected image (`px` appended when bare)
    SetImageWidth(String),
    /// Set a position offset of the selected profile image
    SetImageOffset { axis: OffsetAxis, value: String },

    // Persistence
    LoadRequested,
    LoadFinished(Result<String, String>),
    SaveRequested,
    SaveFinished(Result<(), String>),

    // Templates and export
    TemplatesRequested,
    TemplatesLoaded(Result<Vec<TemplateInfo>, String>),
    SelectTemplate(String),
    SelectPaperSize(PaperSize),
    /// Open the printable export
    ExportRequested,

    // Upload
    OpenUploadDialog,
    CloseUploadDialog,
    /// Alt text typed in the upload dialog
    SetUploadAltText(String),
    /// Start an upload; `None` when no file was picked
    UploadRequested(Option<UploadRequest>),
    UploadProgress(u8),
    UploadFinished(Result<UploadedImage, String>),
    CancelUpload,

    /// Switch between light and dark theme
    ToggleTheme,
}

/// Pure function that updates the model based on a message.
///
/// All state transitions happen here; requests to the backend are issued by
/// the side-effect handler once the new model is in place.
pub fn update(mut model: Model, msg: Message) -> Model {
    match msg {
        // Editing
        Message::EditorChanged(text) => {
            if model.buffer.set_text(&text) {
                model.request_render();
            }
        }
        Message::EditorMoveTo(line, col) => model.buffer.move_to(line, col),
        Message::EditorOpenLineAtEnd => {
            if model.buffer.open_line_at_end() {
                model.request_render();
            }
        }
        Message::RenderCompleted(preview) => model.install_preview(preview),

        // Image formatting
        Message::PreviewClick(target) => model.handle_click(target),
        Message::AlignImage(align) => {
            if model.format_selected_image(annotation::ALIGN, align.as_str()) {
                model.toolbar.active_align = Some(align);
            }
        }
        Message::SetImageWidth(value) => {
            let width = normalize_width(&value);
            if model.format_selected_image(annotation::WIDTH, &width) {
                model.toolbar.width = width;
            }
        }
        Message::SetImageOffset { axis, value } => {
            if !model.selected_image().is_some_and(|image| image.is_profile()) {
                tracing::debug!(?axis, "offset ignored for non-profile image");
                return model;
            }
            let value = value.trim().to_string();
            if model.format_selected_image(axis.key(), &value) {
                match axis {
                    OffsetAxis::X => model.toolbar.x_offset = value,
                    OffsetAxis::Y => model.toolbar.y_offset = value,
                }
            }
        }

        // Persistence
        Message::LoadRequested => model.loading = true,
        Message::LoadFinished(result) => {
            model.loading = false;
            let content = match result {
                Ok(content) => {
                    model.load_error = None;
                    content
                }
                Err(err) => {
                    tracing::error!(%err, "failed to load markdown");
                    model.load_error = Some(err);
                    LOAD_ERROR_PLACEHOLDER.to_string()
                }
            };
            model.buffer.load(&content);
            model.clear_image_selection();
            model.request_render();
        }
        Message::SaveRequested => {
            if model.pending_save.is_some() {
                tracing::debug!("save already in flight");
            } else {
                model.pending_save = Some(model.buffer.text());
            }
        }
        Message::SaveFinished(result) => {
            let saved = model.pending_save.take();
            match result {
                Ok(()) => {
                    if saved.is_some_and(|text| text == model.buffer.text()) {
                        model.buffer.mark_clean();
                    } else {
                        tracing::debug!("buffer changed while saving, still dirty");
                    }
                    model.show_toast_for(ToastLevel::Info, "Saved!", SAVED_TOAST);
                }
                Err(err) => {
                    tracing::error!(%err, "failed to save markdown");
                    model.show_toast(ToastLevel::Error, format!("Failed to save: {err}"));
                }
            }
        }

        // Templates and export
        Message::TemplatesRequested => {}
        Message::TemplatesLoaded(result) => match result {
            Ok(templates) => {
                if model.template_id.is_none() {
                    model.template_id = templates.first().map(|t| t.id.clone());
                }
                model.templates = templates;
            }
            Err(err) => {
                tracing::error!(%err, "failed to fetch templates");
                model.templates.clear();
            }
        },
        Message::SelectTemplate(id) => model.template_id = Some(id),
        Message::SelectPaperSize(size) => model.paper_size = size,
        Message::ExportRequested => {
            model.navigate_to = Some(export_path(model.export_template(), model.paper_size));
        }

        // Upload
        Message::OpenUploadDialog => model.upload.visible = true,
        Message::CloseUploadDialog => {
            if !model.upload.in_flight() {
                model.upload = UploadDialog::default();
            }
        }
        Message::SetUploadAltText(text) => model.upload.alt_text = text,
        Message::UploadRequested(None) => {
            model.show_toast(ToastLevel::Warning, "Please select an image file");
        }
        Message::UploadRequested(Some(_)) => {
            if model.upload.in_flight() {
                tracing::debug!("upload already in flight");
            } else {
                model.upload.progress = Some(0);
            }
        }
        Message::UploadProgress(percent) => {
            if model.upload.in_flight() {
                model.upload.progress = Some(percent.min(100));
            }
        }
        Message::UploadFinished(result) => {
            if !model.upload.in_flight() {
                tracing::debug!("dropping result of a cancelled upload");
                return model;
            }
            model.upload.progress = None;
            match result {
                Ok(image) => {
                    let markdown = image_markdown(&image.alt_text, &uploaded_image_url(&image.id));
                    model.buffer.replace_selection(&markdown);
                    model.upload = UploadDialog::default();
                    model.request_render();
                }
                Err(err) => {
                    tracing::error!(%err, "image upload failed");
                    model.show_toast(ToastLevel::Error, format!("Upload failed: {err}"));
                }
            }
        }
        Message::CancelUpload => model.upload.progress = None,

        Message::ToggleTheme => model.dark_mode = !model.dark_mode,
    }

    model
}
