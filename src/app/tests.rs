use tokio::runtime::Handle;

use crate::annotation::Align;
use crate::api::{PaperSize, TemplateInfo, UploadedImage};
use crate::client::{ApiClient, UploadRequest};
use crate::render::render;

use super::{
    App, BoundingBox, ClickTarget, ImageRef, LOAD_ERROR_PLACEHOLDER, Message, Model, OffsetAxis,
    SelectionState, ToastLevel, update,
};

const ORIGIN: &str = "http://localhost:9876";

const CV: &str = "\
# Jane Doe
![Jane|x-offset=3](/data/images/jane.png)
jane@example.com

## Projects
![Diagram|width=300px](/data/images/diagram.png)
";

/// Apply a message, then perform the render it asked for.
fn step(model: Model, msg: Message) -> Model {
    let mut model = update(model, msg);
    if model.render_requested {
        model.render_requested = false;
        let preview = render(&model.buffer.text(), model.preview.generation + 1);
        model = update(model, Message::RenderCompleted(preview));
    }
    model
}

fn create_test_model(source: &str) -> Model {
    step(Model::new(ORIGIN), Message::EditorChanged(source.to_string()))
}

fn upload_request() -> UploadRequest {
    UploadRequest {
        file_name: "a.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes: vec![1, 2, 3],
        alt_text: "a".to_string(),
    }
}

fn uploaded(id: &str) -> UploadedImage {
    UploadedImage {
        id: id.to_string(),
        url: format!("/data/images/{id}"),
        alt_text: "a".to_string(),
    }
}

fn click_image(model: Model, index: usize) -> Model {
    let target = ClickTarget::Image {
        image: ImageRef {
            generation: model.preview.generation,
            index,
        },
        rect: BoundingBox {
            left: 40.0,
            top: 100.0,
            right: 240.0,
            bottom: 300.0,
        },
        scroll: (0.0, 50.0),
    };
    step(model, Message::PreviewClick(target))
}

#[test]
fn test_editor_change_renders_preview() {
    let model = create_test_model(CV);
    assert_eq!(model.preview.generation, 1);
    assert_eq!(model.preview.images.len(), 2);
    assert!(model.buffer.is_dirty());
}

#[test]
fn test_unchanged_editor_content_does_not_rerender() {
    let model = create_test_model(CV);
    let model = step(model, Message::EditorChanged(CV.to_string()));
    assert_eq!(model.preview.generation, 1);
}

#[test]
fn test_click_selects_image_and_positions_toolbar() {
    let model = click_image(create_test_model(CV), 1);
    assert_eq!(model.selection.url(), Some("/data/images/diagram.png"));
    assert!(model.toolbar.visible);
    assert_eq!(model.toolbar.top, 355.0);
    assert_eq!(model.toolbar.left, 40.0);
    assert_eq!(model.toolbar.width, "300px");
    assert_eq!(model.toolbar.active_align, None);
    assert!(!model.toolbar.position_controls_visible);
}

#[test]
fn test_click_on_profile_image_shows_offsets() {
    let model = click_image(create_test_model(CV), 0);
    assert!(model.toolbar.position_controls_visible);
    assert_eq!(model.toolbar.x_offset, "3");
    assert_eq!(model.toolbar.y_offset, "0");
}

#[test]
fn test_click_elsewhere_hides_toolbar() {
    let model = click_image(create_test_model(CV), 1);
    let model = step(model, Message::PreviewClick(ClickTarget::Toolbar));
    assert!(model.toolbar.visible);

    let model = step(model, Message::PreviewClick(ClickTarget::Elsewhere));
    assert_eq!(model.selection, SelectionState::Idle);
    assert!(!model.toolbar.visible);
}

#[test]
fn test_click_on_stale_element_deselects() {
    let model = click_image(create_test_model(CV), 1);
    let target = ClickTarget::Image {
        image: ImageRef {
            generation: 0,
            index: 0,
        },
        rect: BoundingBox::default(),
        scroll: (0.0, 0.0),
    };
    let model = step(model, Message::PreviewClick(target));
    assert_eq!(model.selection, SelectionState::Idle);
}

#[test]
fn test_align_rewrites_source_and_reacquires_selection() {
    let model = click_image(create_test_model(CV), 1);
    let model = step(model, Message::AlignImage(Align::Center));

    assert!(
        model
            .buffer
            .text()
            .contains("![Diagram|width=300px|align=center](/data/images/diagram.png)")
    );
    assert_eq!(model.preview.generation, 2);
    match &model.selection {
        SelectionState::Selected { image, url } => {
            assert_eq!(image.generation, 2);
            assert_eq!(image.index, 1);
            assert_eq!(url, "/data/images/diagram.png");
        }
        SelectionState::Idle => panic!("selection lost after re-render"),
    }
    assert_eq!(model.toolbar.active_align, Some(Align::Center));
    assert_eq!(model.selected_image().and_then(|i| i.align()), Some(Align::Center));
}

#[test]
fn test_width_gets_px_suffix() {
    let model = click_image(create_test_model(CV), 1);
    let model = step(model, Message::SetImageWidth("150".to_string()));
    assert!(model.buffer.text().contains("![Diagram|width=150px]"));
    assert_eq!(model.toolbar.width, "150px");

    let model = step(model, Message::SetImageWidth("50%".to_string()));
    assert!(model.buffer.text().contains("![Diagram|width=50%]"));
}

#[test]
fn test_offset_updates_profile_image_only() {
    let model = click_image(create_test_model(CV), 0);
    let model = step(
        model,
        Message::SetImageOffset {
            axis: OffsetAxis::Y,
            value: "-12".to_string(),
        },
    );
    assert!(model.buffer.text().contains("![Jane|x-offset=3|y-offset=-12]"));
    assert_eq!(model.toolbar.y_offset, "-12");

    let model = click_image(model, 1);
    let before = model.buffer.text();
    let model = step(
        model,
        Message::SetImageOffset {
            axis: OffsetAxis::X,
            value: "5".to_string(),
        },
    );
    assert_eq!(model.buffer.text(), before);
}

#[test]
fn test_formatting_while_idle_is_noop() {
    let model = create_test_model(CV);
    let model = step(model, Message::AlignImage(Align::Left));
    let model = step(model, Message::SetImageWidth("10".to_string()));
    assert_eq!(model.buffer.text(), CV);
    assert_eq!(model.preview.generation, 1);
}

#[test]
fn test_selection_dropped_when_image_removed() {
    let model = click_image(create_test_model(CV), 1);
    let edited = CV.replace("![Diagram|width=300px](/data/images/diagram.png)\n", "");
    let model = step(model, Message::EditorChanged(edited));
    assert_eq!(model.selection, SelectionState::Idle);
    assert!(!model.toolbar.visible);
}

#[test]
fn test_selection_follows_image_moved_by_edit() {
    let model = click_image(create_test_model(CV), 1);
    let edited = CV.replace(
        "![Diagram|width=300px](/data/images/diagram.png)\n",
        "",
    ) + "![Diagram|width=300px](/data/images/diagram.png)\n";
    let edited = format!("![Logo](/logo.png)\n{edited}");
    let model = step(model, Message::EditorChanged(edited));
    match model.selection {
        SelectionState::Selected { image, .. } => assert_eq!(image.index, 2),
        SelectionState::Idle => panic!("selection lost"),
    }
}

#[test]
fn test_stale_render_is_dropped() {
    let model = create_test_model(CV);
    let old = render("# Old", 0);
    let model = update(model, Message::RenderCompleted(old));
    assert_eq!(model.preview.generation, 1);
    assert_eq!(model.preview.images.len(), 2);
}

#[test]
fn test_load_failure_shows_placeholder() {
    let model = step(Model::new(ORIGIN), Message::LoadRequested);
    assert!(model.loading);
    let model = step(model, Message::LoadFinished(Err("connection refused".to_string())));
    assert!(!model.loading);
    assert_eq!(model.buffer.text(), LOAD_ERROR_PLACEHOLDER);
    assert_eq!(model.load_error.as_deref(), Some("connection refused"));
    assert!(!model.buffer.is_dirty());
    assert!(model.preview.html.contains("Error Loading Content"));
}

#[test]
fn test_load_success_clears_error() {
    let model = step(Model::new(ORIGIN), Message::LoadFinished(Err("down".to_string())));
    let model = step(model, Message::LoadFinished(Ok(CV.to_string())));
    assert_eq!(model.load_error, None);
    assert_eq!(model.buffer.text(), CV);
    assert_eq!(model.preview.images.len(), 2);
}

#[test]
fn test_editor_move_to_positions_insert() {
    let model = create_test_model("# CV\nabout");
    let model = step(model, Message::EditorMoveTo(1, 0));
    assert_eq!(model.buffer.cursor(), crate::editor::Cursor::at(1, 0));
}

#[test]
fn test_save_guard_and_toasts() {
    let model = create_test_model(CV);
    let model = step(model, Message::SaveRequested);
    assert!(model.is_saving());
    let model = step(model, Message::SaveRequested);
    assert!(model.is_saving());

    let model = step(model, Message::SaveFinished(Ok(())));
    assert!(!model.is_saving());
    assert!(!model.buffer.is_dirty());
    assert_eq!(model.active_toast(), Some(("Saved!", ToastLevel::Info)));

    let model = step(model, Message::SaveRequested);
    let model = step(model, Message::SaveFinished(Err("disk full".to_string())));
    assert_eq!(
        model.active_toast(),
        Some(("Failed to save: disk full", ToastLevel::Error))
    );
}

#[test]
fn test_edit_during_save_stays_dirty() {
    let model = step(Model::new(ORIGIN), Message::EditorChanged("# A".to_string()));
    let model = step(model, Message::SaveRequested);
    let model = step(model, Message::EditorChanged("# B".to_string()));
    let model = step(model, Message::SaveFinished(Ok(())));
    assert!(!model.is_saving());
    assert!(model.buffer.is_dirty());
    assert_eq!(model.active_toast(), Some(("Saved!", ToastLevel::Info)));

    let model = step(model, Message::SaveRequested);
    let model = step(model, Message::SaveFinished(Ok(())));
    assert!(!model.buffer.is_dirty());
}

#[test]
fn test_saved_toast_expires() {
    let model = step(Model::new(ORIGIN), Message::SaveFinished(Ok(())));
    let mut model = model;
    let later = std::time::Instant::now() + std::time::Duration::from_secs(3);
    assert!(model.expire_toast(later));
    assert_eq!(model.active_toast(), None);
}

#[test]
fn test_templates_loaded_selects_first() {
    let templates = vec![
        TemplateInfo {
            id: "europass".to_string(),
            ..TemplateInfo::fallback()
        },
        TemplateInfo::fallback(),
    ];
    let model = step(Model::new(ORIGIN), Message::TemplatesLoaded(Ok(templates)));
    assert_eq!(model.template_id.as_deref(), Some("europass"));
    assert_eq!(model.templates.len(), 2);

    let model = step(model, Message::TemplatesLoaded(Err("boom".to_string())));
    assert!(model.templates.is_empty());
}

#[test]
fn test_export_navigates_to_printable_view() {
    let model = step(Model::new(ORIGIN), Message::SelectPaperSize(PaperSize::Letter));
    let model = step(model, Message::ExportRequested);
    assert_eq!(
        model.navigate_to.as_deref(),
        Some("/api/pdf?template_id=europass&paper_size=letter")
    );

    let model = step(model, Message::SelectTemplate("modern".to_string()));
    let model = step(model, Message::ExportRequested);
    assert_eq!(
        model.navigate_to.as_deref(),
        Some("/api/pdf?template_id=modern&paper_size=letter")
    );
}

#[test]
fn test_upload_without_file_warns() {
    let model = step(Model::new(ORIGIN), Message::OpenUploadDialog);
    let model = step(model, Message::UploadRequested(None));
    assert_eq!(model.upload.progress, None);
    assert_eq!(
        model.active_toast(),
        Some(("Please select an image file", ToastLevel::Warning))
    );
}

#[test]
fn test_upload_inserts_image_at_cursor() {
    let mut model = create_test_model("# CV\n\nAbout me");
    model.buffer.move_to(1, 0);
    let model = step(model, Message::OpenUploadDialog);
    let model = step(model, Message::SetUploadAltText("Me".to_string()));
    let request = UploadRequest {
        file_name: "me.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes: vec![1, 2, 3],
        alt_text: "Me".to_string(),
    };
    let model = step(model, Message::UploadRequested(Some(request)));
    assert_eq!(model.upload.progress, Some(0));
    let model = step(model, Message::UploadProgress(60));
    assert_eq!(model.upload.progress, Some(60));

    let uploaded = UploadedImage {
        id: "abc.png".to_string(),
        url: "/api/images/abc.png".to_string(),
        alt_text: "Me".to_string(),
    };
    let model = step(model, Message::UploadFinished(Ok(uploaded)));
    assert_eq!(model.buffer.text(), "# CV\n![Me](/data/images/abc.png)\nAbout me");
    assert!(!model.upload.visible);
    assert_eq!(model.upload.progress, None);
    assert_eq!(model.preview.images.len(), 1);
}

#[test]
fn test_upload_failure_keeps_dialog_open() {
    let model = step(Model::new(ORIGIN), Message::OpenUploadDialog);
    let model = step(model, Message::UploadRequested(Some(upload_request())));
    let model = step(
        model,
        Message::UploadFinished(Err("server responded 400".to_string())),
    );
    assert!(model.upload.visible);
    assert_eq!(
        model.active_toast(),
        Some(("Upload failed: server responded 400", ToastLevel::Error))
    );
}

#[test]
fn test_upload_result_after_cancel_is_dropped() {
    let model = create_test_model("# CV\n");
    let model = step(model, Message::OpenUploadDialog);
    let model = step(model, Message::UploadRequested(Some(upload_request())));
    let model = step(model, Message::CancelUpload);
    let model = step(model, Message::UploadFinished(Ok(uploaded("late.png"))));
    assert_eq!(model.buffer.text(), "# CV\n");
    assert!(model.upload.visible);
    assert_eq!(model.preview.generation, 1);
}

#[test]
fn test_upload_appends_on_new_line_at_end() {
    let model = create_test_model("# CV\nhello");
    let model = step(model, Message::EditorOpenLineAtEnd);
    let model = step(model, Message::OpenUploadDialog);
    let model = step(model, Message::UploadRequested(Some(upload_request())));
    let model = step(model, Message::UploadFinished(Ok(uploaded("x.png"))));
    assert_eq!(model.buffer.text(), "# CV\nhello\n![a](/data/images/x.png)");
    assert_eq!(model.preview.images.len(), 1);
}

#[test]
fn test_align_image_with_bracketed_alt() {
    let model = click_image(create_test_model("# CV\n\n![Photo [2024]|width=100px](/x/a.png)\n"), 0);
    assert_eq!(model.selection.url(), Some("/x/a.png"));
    assert_eq!(model.toolbar.width, "100px");

    let model = step(model, Message::AlignImage(Align::Right));
    assert_eq!(
        model.buffer.text(),
        "# CV\n\n![Photo [2024]|width=100px|align=right](/x/a.png)\n"
    );
    assert_eq!(model.selection.url(), Some("/x/a.png"));
    assert_eq!(model.toolbar.active_align, Some(Align::Right));
}

#[test]
fn test_profile_offsets_shown_as_written() {
    let source = "# Jane\n![Jane|x-offset=1.5](/data/images/jane.png)\n";
    let model = click_image(create_test_model(source), 0);
    assert!(model.toolbar.position_controls_visible);
    assert_eq!(model.toolbar.x_offset, "1.5");
    assert_eq!(model.toolbar.y_offset, "0");
}

#[test]
fn test_toggle_theme() {
    let model = step(Model::new(ORIGIN), Message::ToggleTheme);
    assert!(model.dark_mode);
    let model = step(model, Message::ToggleTheme);
    assert!(!model.dark_mode);
}

#[tokio::test]
async fn test_app_dispatch_renders_synchronously() {
    let mut app = App::new(ApiClient::new(ORIGIN), Handle::current());
    app.dispatch(Message::EditorChanged(CV.to_string()));
    assert_eq!(app.model().preview.generation, 1);
    assert!(!app.is_busy());
    assert!(!app.next_completion().await);
}

#[tokio::test]
async fn test_app_save_against_unreachable_server_reports_failure() {
    let mut app = App::new(ApiClient::new("http://127.0.0.1:9"), Handle::current());
    app.dispatch(Message::EditorChanged(CV.to_string()));
    app.dispatch(Message::SaveRequested);
    app.dispatch(Message::SaveRequested);
    assert!(app.is_busy());

    app.settle().await;
    assert!(!app.is_busy());
    assert!(!app.model().is_saving());
    let (toast, level) = app.model().active_toast().unwrap();
    assert!(toast.starts_with("Failed to save:"));
    assert_eq!(level, ToastLevel::Error);
}

#[tokio::test]
async fn test_app_cancel_upload_aborts_request() {
    let mut app = App::new(ApiClient::new("http://127.0.0.1:9"), Handle::current());
    app.dispatch(Message::OpenUploadDialog);
    app.dispatch(Message::UploadRequested(Some(UploadRequest {
        file_name: "a.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes: vec![0; 16],
        alt_text: String::new(),
    })));
    assert!(app.is_busy());
    app.dispatch(Message::CancelUpload);
    assert!(!app.is_busy());
    assert_eq!(app.model().upload.progress, None);
    assert!(app.model().upload.visible);
}

#[tokio::test]
async fn test_app_take_navigation() {
    let mut app = App::new(ApiClient::new(ORIGIN), Handle::current());
    app.dispatch(Message::ExportRequested);
    assert_eq!(
        app.take_navigation().as_deref(),
        Some("/api/pdf?template_id=europass&paper_size=a4")
    );
    assert_eq!(app.take_navigation(), None);
}
