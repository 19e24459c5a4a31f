//! Image selection in the preview and the formatting toolbar.
//!
//! A click on a preview image selects it and shows the toolbar under it.
//! The selection is tied to a render generation; when the preview is
//! re-rendered it is re-acquired by url, or dropped if the image is gone.

use crate::annotation::{self, Align};
use crate::document::{find_image_alt, set_image_property};
use crate::render::{Preview, RenderedImage};

use super::Model;

/// Vertical gap between the selected image and the toolbar.
pub const TOOLBAR_GAP: f64 = 5.0;

/// An image element of a specific render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef {
    pub generation: u64,
    pub index: usize,
}

/// Viewport-relative rectangle of a clicked element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// What a click in the preview landed on.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    Image {
        image: ImageRef,
        rect: BoundingBox,
        /// Page scroll offsets `(x, y)` at the time of the click.
        scroll: (f64, f64),
    },
    Toolbar,
    Elsewhere,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Idle,
    Selected {
        image: ImageRef,
        /// Source url of the selected image, origin stripped.
        url: String,
    },
}

impl SelectionState {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Selected { url, .. } => Some(url),
        }
    }
}

/// Formatting toolbar state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Toolbar {
    pub visible: bool,
    /// Page coordinates of the toolbar's top-left corner.
    pub top: f64,
    pub left: f64,
    /// Alignment button shown as active.
    pub active_align: Option<Align>,
    pub width: String,
    pub x_offset: String,
    pub y_offset: String,
    /// Offset inputs are only offered for the profile image.
    pub position_controls_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetAxis {
    X,
    Y,
}

impl OffsetAxis {
    pub const fn key(self) -> &'static str {
        match self {
            Self::X => annotation::X_OFFSET,
            Self::Y => annotation::Y_OFFSET,
        }
    }
}

/// Strip the page origin from an absolute image src.
pub fn strip_origin<'a>(src: &'a str, origin: &str) -> &'a str {
    if origin.is_empty() {
        return src;
    }
    src.strip_prefix(origin.trim_end_matches('/')).unwrap_or(src)
}

/// Append `px` to a bare width value.
pub fn normalize_width(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() || value.contains("px") || value.contains('%') {
        value.to_string()
    } else {
        format!("{value}px")
    }
}

impl Model {
    /// The selected element, if it belongs to the current preview.
    pub fn selected_image(&self) -> Option<&RenderedImage> {
        match &self.selection {
            SelectionState::Selected { image, .. } if image.generation == self.preview.generation => {
                self.preview.image(image.index)
            }
            _ => None,
        }
    }

    pub(super) fn handle_click(&mut self, target: ClickTarget) {
        match target {
            ClickTarget::Image { image, rect, scroll } => {
                if image.generation != self.preview.generation {
                    tracing::debug!(?image, "click on a stale preview element");
                    self.clear_image_selection();
                    return;
                }
                self.select_image(image, rect, scroll);
            }
            ClickTarget::Toolbar => {}
            ClickTarget::Elsewhere => self.clear_image_selection(),
        }
    }

    fn select_image(&mut self, image: ImageRef, rect: BoundingBox, (scroll_x, scroll_y): (f64, f64)) {
        let Some(element) = self.preview.image(image.index).cloned() else {
            self.clear_image_selection();
            return;
        };
        let url = strip_origin(&element.src, &self.page_origin).to_string();

        self.toolbar.top = rect.bottom + scroll_y + TOOLBAR_GAP;
        self.toolbar.left = rect.left + scroll_x;
        self.toolbar.visible = true;
        self.populate_toolbar(&element, &url);
        self.selection = SelectionState::Selected { image, url };
    }

    pub(super) fn clear_image_selection(&mut self) {
        self.selection = SelectionState::Idle;
        self.toolbar = Toolbar::default();
    }

    /// Fill the controls from the element and its source token.
    fn populate_toolbar(&mut self, element: &RenderedImage, url: &str) {
        self.toolbar.active_align = element.align();
        self.toolbar.width = element.width.clone().unwrap_or_default();

        if !element.is_profile() {
            self.toolbar.position_controls_visible = false;
            self.toolbar.x_offset.clear();
            self.toolbar.y_offset.clear();
            return;
        }
        match find_image_alt(&self.buffer.text(), url) {
            Some(alt) => {
                let set = annotation::decode_str(&alt);
                let raw = |key: &str| set.get(key).unwrap_or("0").to_string();
                self.toolbar.x_offset = raw(annotation::X_OFFSET);
                self.toolbar.y_offset = raw(annotation::Y_OFFSET);
                self.toolbar.position_controls_visible = true;
            }
            None => {
                self.toolbar.x_offset = "0".to_string();
                self.toolbar.y_offset = "0".to_string();
                self.toolbar.position_controls_visible = false;
            }
        }
    }

    /// Write one annotation of the selected image back into the source.
    ///
    /// Returns whether the source changed. Does nothing while idle.
    pub(super) fn format_selected_image(&mut self, key: &str, value: &str) -> bool {
        let Some(url) = self.selection.url() else {
            return false;
        };
        let source = self.buffer.text();
        let replacement = set_image_property(&source, url, key, value);
        if !replacement.found {
            return false;
        }
        let changed = self.buffer.set_text(&replacement.new_source);
        if changed {
            self.render_requested = true;
        }
        changed
    }

    /// Install a new preview and re-find the selected image in it.
    pub(super) fn install_preview(&mut self, preview: Preview) {
        if preview.generation < self.preview.generation {
            tracing::debug!(
                generation = preview.generation,
                current = self.preview.generation,
                "dropping stale render"
            );
            return;
        }
        self.preview = preview;

        let Some(url) = self.selection.url().map(ToOwned::to_owned) else {
            return;
        };
        match self.preview.find_by_src(&url) {
            Some(index) => {
                let image = ImageRef {
                    generation: self.preview.generation,
                    index,
                };
                if let Some(element) = self.preview.image(index).cloned() {
                    self.populate_toolbar(&element, &url);
                }
                self.selection = SelectionState::Selected { image, url };
            }
            None => {
                tracing::debug!(%url, "selected image left the preview");
                self.clear_image_selection();
            }
        }
    }
}
