//! CV structure extraction used by the printable export.

use crate::annotation::{self, AnnotationSet};

use super::images::{ImageToken, image_tokens};

/// Url prefixes of images stored by the backend.
pub const LOCAL_IMAGE_PREFIXES: &[&str] = &["/data/images/", "/api/images/"];

/// The profile image sits near the top of the document, within this many lines.
const PROFILE_IMAGE_MAX_LINE: usize = 5;

/// The first locally stored image of a CV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileImage {
    /// Stored image id (last url segment).
    pub id: String,
    pub url: String,
    pub annotations: AnnotationSet,
    /// Zero-based source line of the token.
    pub line: usize,
}

impl ProfileImage {
    /// Position offsets from the `x-offset`/`y-offset` annotations.
    pub fn offsets(&self) -> (i32, i32) {
        image_offsets(&self.annotations)
    }
}

/// A source with its profile image split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileExtraction {
    pub image: Option<ProfileImage>,
    /// Source with the profile token removed when it sits near the top.
    pub content: String,
}

/// Sections rendered separately by CV templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CvSections {
    pub contact_info: Vec<String>,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
}

pub fn is_local_image(url: &str) -> bool {
    LOCAL_IMAGE_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix) && url.len() > prefix.len())
}

/// First image token pointing at a locally stored image.
pub fn first_local_image(source: &str) -> Option<ImageToken> {
    image_tokens(source)
        .into_iter()
        .find(|token| is_local_image(&token.url))
}

/// Pick the profile image and remove it from the body if it is near the top.
pub fn extract_profile_image(source: &str) -> ProfileExtraction {
    let Some(token) = first_local_image(source) else {
        return ProfileExtraction {
            image: None,
            content: source.to_string(),
        };
    };

    let line = source[..token.range.start].matches('\n').count();
    let id = token.url.rsplit('/').next().unwrap_or_default().to_string();
    let content = if line < PROFILE_IMAGE_MAX_LINE {
        let mut content = String::with_capacity(source.len());
        content.push_str(&source[..token.range.start]);
        content.push_str(&source[token.range.end..]);
        content
    } else {
        source.to_string()
    };

    ProfileExtraction {
        image: Some(ProfileImage {
            id,
            annotations: token.annotations(),
            url: token.url,
            line,
        }),
        content,
    }
}

/// Url of the image the preview marks as the profile image: the first local
/// image, when it sits within the first few lines.
pub fn profile_image_url(source: &str) -> Option<String> {
    first_local_image(source)
        .filter(|token| source[..token.range.start].matches('\n').count() < PROFILE_IMAGE_MAX_LINE)
        .map(|token| token.url)
}

/// Parsed position offsets, defaulting to zero.
pub fn image_offsets(set: &AnnotationSet) -> (i32, i32) {
    let parse = |key: &str| {
        set.get(key)
            .and_then(|v| v.trim_end_matches("px").parse().ok())
            .unwrap_or(0)
    };
    (parse(annotation::X_OFFSET), parse(annotation::Y_OFFSET))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Skills,
    Languages,
}

/// Collect contact info, skills and languages from a CV source.
pub fn extract_sections(source: &str) -> CvSections {
    let mut sections = CvSections::default();
    let lines: Vec<&str> = source.lines().collect();

    if let Some(title_idx) = lines.iter().position(|line| line.starts_with("# ")) {
        sections.contact_info = lines[title_idx + 1..]
            .iter()
            .take_while(|line| !line.starts_with("## "))
            .filter(|line| !line.trim().is_empty() && !line.starts_with("!["))
            .map(|line| (*line).to_string())
            .collect();
    }

    let mut current = Section::Other;
    for line in &lines {
        if line.starts_with("## Skills") {
            current = Section::Skills;
            continue;
        }
        if line.starts_with("## Languages") {
            current = Section::Languages;
            continue;
        }
        if line.starts_with("## ") {
            current = Section::Other;
            continue;
        }
        if !line.starts_with("- ") {
            continue;
        }
        match current {
            Section::Skills => sections.skills.push((*line).to_string()),
            Section::Languages => sections.languages.push((*line).to_string()),
            Section::Other => {}
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    const CV: &str = "\
# Jane Doe
![Jane|x-offset=12|y-offset=-4](/data/images/jane.png)
jane@example.com
+1 555 0100

## Skills
- Rust
- SQL
not a bullet

## Experience
- Acme

## Languages
- English
- French
";

    #[test]
    fn test_extract_profile_image_removes_token_near_top() {
        let extraction = extract_profile_image(CV);
        let image = extraction.image.unwrap();
        assert_eq!(image.id, "jane.png");
        assert_eq!(image.url, "/data/images/jane.png");
        assert_eq!(image.line, 1);
        assert_eq!(image.offsets(), (12, -4));
        assert!(!extraction.content.contains("jane.png"));
        assert!(extraction.content.starts_with("# Jane Doe\n\njane@example.com"));
    }

    #[test]
    fn test_extract_profile_image_keeps_token_further_down() {
        let md = "# A\n\n\n\n\n\n![x](/data/images/late.png)\n";
        let extraction = extract_profile_image(md);
        assert_eq!(extraction.image.unwrap().id, "late.png");
        assert_eq!(extraction.content, md);
    }

    #[test]
    fn test_extract_profile_image_ignores_remote_images() {
        let md = "# A\n![x](https://example.com/a.png)\n";
        let extraction = extract_profile_image(md);
        assert!(extraction.image.is_none());
        assert_eq!(extraction.content, md);
    }

    #[test]
    fn test_profile_image_url_picks_first_local_image_near_top() {
        let md = "![r](https://x/a.png)\n![p](/data/images/p.png)\n![q](/data/images/q.png)";
        assert_eq!(profile_image_url(md).as_deref(), Some("/data/images/p.png"));
        let md = "# A\n\n\n\n\n\n![x](/data/images/late.png)\n";
        assert_eq!(profile_image_url(md), None);
    }

    #[test]
    fn test_image_offsets_default_to_zero() {
        let set = AnnotationSet::new("x").with(annotation::X_OFFSET, "abc");
        assert_eq!(image_offsets(&set), (0, 0));
        let set = AnnotationSet::new("x").with(annotation::Y_OFFSET, "8px");
        assert_eq!(image_offsets(&set), (0, 8));
    }

    #[test]
    fn test_extract_sections() {
        let sections = extract_sections(CV);
        assert_eq!(
            sections.contact_info,
            vec!["jane@example.com", "+1 555 0100"]
        );
        assert_eq!(sections.skills, vec!["- Rust", "- SQL"]);
        assert_eq!(sections.languages, vec!["- English", "- French"]);
    }

    #[test]
    fn test_extract_sections_without_title() {
        let sections = extract_sections("## Skills\n- Go\n");
        assert!(sections.contact_info.is_empty());
        assert_eq!(sections.skills, vec!["- Go"]);
    }
}
