//! Markdown source model.
//!
//! This module handles:
//! - Scanning image tokens (`![alt](url)`) and rewriting one in place
//! - Extracting CV structure (profile image, contact info, skills, languages)

mod images;
mod sections;

pub use images::{
    ImageToken, Replacement, find_image, find_image_alt, image_markdown, image_tokens,
    locate_and_replace_image, set_image_property,
};
pub use sections::{
    CvSections, LOCAL_IMAGE_PREFIXES, ProfileExtraction, ProfileImage, extract_profile_image,
    extract_sections, first_local_image, image_offsets, is_local_image, profile_image_url,
};

/// Url under which an uploaded image is served.
pub fn uploaded_image_url(id: &str) -> String {
    format!("{}{id}", LOCAL_IMAGE_PREFIXES[0])
}
