//! Markdown to HTML preview rendering with comrak.
//!
//! Images are emitted as `<img>` tags carrying the annotations of their alt
//! text: `width` becomes an inline style, `align` becomes float/centering
//! classes, and the profile image gets the `profile-image` marker class.
//! Alongside the HTML, every rendered image is described by a
//! [`RenderedImage`], which is what the selection tracker works with.

use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options, format_html, parse_document};

use crate::annotation::{self, Align, AnnotationSet};
use crate::document::profile_image_url;

/// Base class of every rendered image.
pub const IMAGE_CLASS: &str = "cv-image";
/// Marker class of the profile image.
pub const PROFILE_CLASS: &str = "profile-image";

/// An `<img>` element of the rendered preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// The `src` attribute as written in the markdown.
    pub src: String,
    /// Decoded alt text (annotations stripped).
    pub alt: String,
    pub title: String,
    pub classes: Vec<String>,
    /// Inline `width` style, if any.
    pub width: Option<String>,
}

impl RenderedImage {
    fn new(src: String, title: String, set: &AnnotationSet, profile: bool) -> Self {
        let mut classes = vec![IMAGE_CLASS.to_string()];
        let align_classes: &[&str] = match set.align() {
            Some(Align::Left) => &["float-left", "mr-4", "mb-2"],
            Some(Align::Right) => &["float-right", "ml-4", "mb-2"],
            Some(Align::Center) => &["mx-auto", "block"],
            None => &[],
        };
        classes.extend(align_classes.iter().map(|c| (*c).to_string()));
        if profile {
            classes.push(PROFILE_CLASS.to_string());
        }
        Self {
            src,
            alt: set.alt.clone(),
            title,
            classes,
            width: set.width().map(ToOwned::to_owned),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn is_profile(&self) -> bool {
        self.has_class(PROFILE_CLASS)
    }

    /// Alignment as reflected by the element's classes.
    pub fn align(&self) -> Option<Align> {
        if self.has_class("float-left") {
            Some(Align::Left)
        } else if self.has_class("float-right") {
            Some(Align::Right)
        } else if self.has_class("mx-auto") {
            Some(Align::Center)
        } else {
            None
        }
    }

    /// The element as HTML.
    pub fn to_html(&self) -> String {
        let style = self
            .width
            .as_deref()
            .map(|w| format!("width: {w};"))
            .unwrap_or_default();
        format!(
            r#"<img src="{}" alt="{}" title="{}" class="{}" style="{}">"#,
            escape_attr(&self.src),
            escape_attr(&self.alt),
            escape_attr(&self.title),
            escape_attr(&self.classes.join(" ")),
            escape_attr(&style),
        )
    }
}

/// Output of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preview {
    /// Render counter; element references from another generation are stale.
    pub generation: u64,
    pub html: String,
    pub images: Vec<RenderedImage>,
}

impl Preview {
    pub fn image(&self, index: usize) -> Option<&RenderedImage> {
        self.images.get(index)
    }

    /// Index of the first image whose src contains `url`.
    pub fn find_by_src(&self, url: &str) -> Option<usize> {
        self.images.iter().position(|img| img.src.contains(url))
    }
}

fn create_options() -> Options {
    let mut options = Options::default();

    // GFM, with single newlines rendered as line breaks
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.render.hardbreaks = true;

    // Image tags are injected as raw HTML
    options.render.unsafe_ = true;

    options
}

/// Render a markdown source into a preview.
pub fn render(source: &str, generation: u64) -> Preview {
    let (html, images) = render_with_images(source);
    Preview {
        generation,
        html,
        images,
    }
}

/// Render a markdown source into HTML.
pub fn render_html(source: &str) -> String {
    render_with_images(source).0
}

/// Render a single line of markdown without the surrounding paragraph.
pub fn render_inline(text: &str) -> String {
    let html = render_html(text);
    let html = html.trim();
    match html
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("<p>") => inner.to_string(),
        _ => html.to_string(),
    }
}

fn render_with_images(source: &str) -> (String, Vec<RenderedImage>) {
    let arena = Arena::new();
    let options = create_options();
    let root = parse_document(&arena, source, &options);

    let mut profile_url = profile_image_url(source);
    let image_nodes: Vec<_> = root
        .descendants()
        .filter(|node| matches!(node.data.borrow().value, NodeValue::Image(_)))
        .collect();

    let mut images = Vec::with_capacity(image_nodes.len());
    for node in image_nodes {
        let (src, title) = match &node.data.borrow().value {
            NodeValue::Image(link) => (link.url.clone(), link.title.clone()),
            _ => continue,
        };
        let set = annotation::decode_str(&collect_text(node));
        let profile = profile_url.as_deref() == Some(src.as_str());
        if profile {
            profile_url = None;
        }

        let image = RenderedImage::new(src, title, &set, profile);
        for child in node.children().collect::<Vec<_>>() {
            child.detach();
        }
        node.data.borrow_mut().value = NodeValue::HtmlInline(image.to_html());
        images.push(image);
    }

    let mut out = Vec::new();
    if let Err(err) = format_html(root, &options, &mut out) {
        tracing::warn!(%err, "preview render truncated");
    }
    (String::from_utf8_lossy(&out).into_owned(), images)
}

/// Plain text of an inline subtree, as used for image alt text.
fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for child in node.descendants().skip(1) {
        match &child.data.borrow().value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
