use anyhow::Context;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::api::{
    ExportParams, ImageInfo, ImagePosition, MarkdownDocument, SaveMarkdown, Status, TemplateInfo,
    UploadedImage,
};

use super::error::ApiError;
use super::{AppState, export};

pub(super) async fn get_markdown(
    State(state): State<AppState>,
) -> Result<Json<MarkdownDocument>, ApiError> {
    let content = state.markdown.load().await?;
    Ok(Json(MarkdownDocument { content }))
}

pub(super) async fn save_markdown(
    State(state): State<AppState>,
    payload: Result<Json<SaveMarkdown>, JsonRejection>,
) -> Result<Json<Status>, ApiError> {
    let Json(body) = payload?;
    state.markdown.save(&body.markdown).await?;
    Ok(Json(Status::success()))
}

pub(super) async fn list_templates(State(state): State<AppState>) -> Json<Vec<TemplateInfo>> {
    Json(state.templates.list().await)
}

pub(super) async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadedImage>, ApiError> {
    let mut file = None;
    let mut alt_text = String::new();
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(ToOwned::to_owned);
                let bytes = field.bytes().await?;
                file = Some((name, content_type, bytes));
            }
            Some("alt_text") => alt_text = field.text().await?,
            _ => {}
        }
    }

    let Some((name, content_type, bytes)) = file else {
        return Err(ApiError::BadRequest("Missing file".to_string()));
    };
    if !content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"))
    {
        return Err(ApiError::BadRequest(
            "Only image files are allowed".to_string(),
        ));
    }

    let uploaded = state.images.store(&name, &bytes, &alt_text).await?;
    Ok(Json(uploaded))
}

pub(super) async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageInfo>>, ApiError> {
    Ok(Json(state.images.list().await?))
}

pub(super) async fn update_image_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<ImagePosition>, QueryRejection>,
) -> Result<Json<Status>, ApiError> {
    let Query(position) = query?;
    if state.images.set_position(&id, position).await? {
        Ok(Json(Status::success()))
    } else {
        Err(ApiError::NotFound("Image not found".to_string()))
    }
}

/// Printable HTML of the CV; also kept as `<data_dir>/cv.html`.
pub(super) async fn printable(
    State(state): State<AppState>,
    query: Result<Query<ExportParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query?;
    let source = state.markdown.load().await?;
    let html =
        export::printable_html(&source, &params, &state.templates, &state.images).await?;

    let path = state.config.data_dir.join("cv.html");
    tokio::fs::write(&path, &html)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(
        template_id = %params.template_id,
        paper_size = %params.paper_size,
        path = %path.display(),
        "printable CV generated"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CONTENT_DISPOSITION, r#"inline; filename="cv.html""#),
        ],
        html,
    )
        .into_response())
}
