//! Printable CV export.
//!
//! The CV is rendered to HTML and poured into a template together with the
//! profile image and the contact, skills and language sections. Local
//! images are inlined as data URLs so the page prints without the server.

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use minijinja::Environment;
use serde::Serialize;

use crate::annotation;
use crate::api::ExportParams;
use crate::document::{
    ProfileImage, extract_profile_image, extract_sections, image_markdown, image_tokens,
    is_local_image,
};
use crate::render::{render_html, render_inline};

use super::images::ImageStore;
use super::templates::TemplateCatalog;

/// Opens the print dialog once the page has loaded.
pub const PRINT_SCRIPT: &str = r"
<script>
window.onload = function() {
    setTimeout(function() {
        window.print();
    }, 500);
}
</script>
";

/// Page used when no template HTML is installed.
const BUILTIN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>CV</title>
<style>
@page { size: {{ papersize }}; margin: 2cm; }
body { font-family: "DejaVu Sans", Helvetica, Arial, sans-serif; line-height: 1.4; }
h1, h2 { color: {{ themecolor }}; }
.float-left { float: left; }
.float-right { float: right; }
.mx-auto { margin-left: auto; margin-right: auto; }
.block { display: block; }
.mr-4 { margin-right: 1rem; }
.ml-4 { margin-left: 1rem; }
.mb-2 { margin-bottom: 0.5rem; }
.profile-image { float: right; max-width: 150px; }
</style>
</head>
<body>
{% if first_image %}<img class="profile-image" src="{{ first_image }}" alt="" style="transform: translate({{ image_x_offset }}px, {{ image_y_offset }}px);">{% endif %}
{{ body }}
</body>
</html>
"#;

/// Variables available to CV templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportContext {
    /// HTML of the CV without the profile image.
    pub body: String,
    pub papersize: String,
    pub themecolor: String,
    /// Data URL (or url) of the profile image.
    pub first_image: Option<String>,
    pub image_x_offset: i32,
    pub image_y_offset: i32,
    pub contact_info: Vec<String>,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
}

/// Build the template context for a CV source.
pub async fn build_context(
    source: &str,
    params: &ExportParams,
    images: &ImageStore,
) -> Result<ExportContext> {
    let extraction = extract_profile_image(source);
    let sections = extract_sections(&extraction.content);
    let content = inline_images(&extraction.content, images).await;

    let mut context = ExportContext {
        body: render_html(&content),
        papersize: params.paper_size.to_string(),
        themecolor: params.theme_color.clone(),
        contact_info: render_items(&sections.contact_info),
        skills: render_items(&sections.skills),
        languages: render_items(&sections.languages),
        ..ExportContext::default()
    };

    if let Some(profile) = &extraction.image {
        let (x, y) = profile_offsets(profile, images).await?;
        context.image_x_offset = x;
        context.image_y_offset = y;
        context.first_image = Some(match images.read(&profile.id).await {
            Some(bytes) => data_url(&bytes),
            None => profile.url.clone(),
        });
    }
    Ok(context)
}

/// Render the printable page for `source`.
pub async fn printable_html(
    source: &str,
    params: &ExportParams,
    catalog: &TemplateCatalog,
    images: &ImageStore,
) -> Result<String> {
    let context = build_context(source, params, images).await?;
    let html = match catalog.resolve(&params.template_id).await {
        Some(path) => {
            let template = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            render_template(&template, &context)
                .with_context(|| format!("Failed to render {}", path.display()))?
        }
        None => {
            tracing::warn!(template_id = %params.template_id, "using built-in page");
            render_template(BUILTIN_TEMPLATE, &context)?
        }
    };
    Ok(add_print_script(&html))
}

pub fn render_template(template: &str, context: &ExportContext) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(template, context)?)
}

/// Insert the print script before the closing body tag.
pub fn add_print_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(idx) => format!("{}{PRINT_SCRIPT}{}", &html[..idx], &html[idx..]),
        None => format!("{html}{PRINT_SCRIPT}"),
    }
}

/// Offsets from the image annotations, or else those recorded for the upload.
async fn profile_offsets(profile: &ProfileImage, images: &ImageStore) -> Result<(i32, i32)> {
    let annotated = profile.annotations.get(annotation::X_OFFSET).is_some()
        || profile.annotations.get(annotation::Y_OFFSET).is_some();
    if annotated {
        return Ok(profile.offsets());
    }
    Ok(images
        .position(&profile.id)
        .await?
        .map_or((0, 0), |p| (p.x_offset, p.y_offset)))
}

/// Replace the urls of stored images with data URLs.
async fn inline_images(source: &str, images: &ImageStore) -> String {
    let mut out = source.to_string();
    for token in image_tokens(source).into_iter().rev() {
        if !is_local_image(&token.url) {
            continue;
        }
        let id = token.url.rsplit('/').next().unwrap_or_default();
        let Some(bytes) = images.read(id).await else {
            tracing::warn!(url = %token.url, "image missing from store");
            continue;
        };
        out.replace_range(token.range, &image_markdown(&token.alt, &data_url(&bytes)));
    }
    out
}

fn data_url(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes).map_or("application/octet-stream", |f| f.to_mime_type());
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn render_items(items: &[String]) -> Vec<String> {
    items.iter().map(|item| render_inline(item)).collect()
}
