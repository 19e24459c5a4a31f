//! Image token scanning and in-place rewriting.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::annotation::{self, AnnotationSet};

/// Alt text of an image token on one line. Bracket pairs such as
/// `Photo [2024]` may appear inside it, unpaired brackets may not.
const ALT_PATTERN: &str = r"!\[((?:[^\[\]\n]|\[[^\[\]\n]*\])*)\]\(";

static IMAGE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{ALT_PATTERN}([^)\n]*)\)")).expect("image token pattern is valid")
});

/// One `![alt](url)` occurrence in a markdown source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageToken {
    /// Byte range of the whole token in the source.
    pub range: Range<usize>,
    /// Raw (still encoded) alt text.
    pub alt: String,
    pub url: String,
}

impl ImageToken {
    /// Decoded annotations of this token.
    pub fn annotations(&self) -> AnnotationSet {
        annotation::decode_str(&self.alt)
    }
}

/// Result of [`locate_and_replace_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub new_source: String,
    pub found: bool,
}

/// All image tokens in source order.
pub fn image_tokens(source: &str) -> Vec<ImageToken> {
    IMAGE_TOKEN
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(ImageToken {
                range: whole.range(),
                alt: caps.get(1)?.as_str().to_string(),
                url: caps.get(2)?.as_str().to_string(),
            })
        })
        .collect()
}

/// Pattern matching an image token whose url is exactly `image_url`.
///
/// The url is escaped, so characters like `?`, `+` or `(` match literally.
fn token_pattern_for(image_url: &str) -> Option<Regex> {
    Regex::new(&format!(r"{ALT_PATTERN}{}\)", regex::escape(image_url))).ok()
}

/// First image token in `source` whose url is exactly `image_url`.
pub fn find_image(source: &str, image_url: &str) -> Option<ImageToken> {
    let pattern = token_pattern_for(image_url)?;
    let caps = pattern.captures(source)?;
    let whole = caps.get(0)?;
    Some(ImageToken {
        range: whole.range(),
        alt: caps.get(1)?.as_str().to_string(),
        url: image_url.to_string(),
    })
}

/// Raw alt text of the first image token pointing at `image_url`.
pub fn find_image_alt(source: &str, image_url: &str) -> Option<String> {
    find_image(source, image_url).map(|token| token.alt)
}

/// Rewrite the annotations of the first image token pointing at `image_url`.
///
/// Only the first textual occurrence is touched; later tokens with the same
/// url are left as they are. When no token matches, the source is returned
/// unchanged with `found == false`.
pub fn locate_and_replace_image<F>(source: &str, image_url: &str, mutate: F) -> Replacement
where
    F: FnOnce(AnnotationSet) -> AnnotationSet,
{
    let Some(token) = find_image(source, image_url) else {
        tracing::debug!(url = image_url, "image token not found");
        return Replacement {
            new_source: source.to_string(),
            found: false,
        };
    };

    let updated = mutate(token.annotations());
    let rewritten = image_markdown(&annotation::encode(&updated), image_url);

    let mut new_source = String::with_capacity(source.len() + rewritten.len());
    new_source.push_str(&source[..token.range.start]);
    new_source.push_str(&rewritten);
    new_source.push_str(&source[token.range.end..]);
    Replacement {
        new_source,
        found: true,
    }
}

/// Set one annotation property on the first image pointing at `image_url`.
pub fn set_image_property(source: &str, image_url: &str, key: &str, value: &str) -> Replacement {
    locate_and_replace_image(source, image_url, |mut set| {
        set.set(key, value);
        set
    })
}

/// Markdown for an image token.
pub fn image_markdown(alt: &str, url: &str) -> String {
    format!("![{alt}]({url})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Align;

    fn set_align_right(mut set: AnnotationSet) -> AnnotationSet {
        set.set(annotation::ALIGN, Align::Right.as_str());
        set
    }

    #[test]
    fn test_image_tokens_lists_every_image_in_order() {
        let md = "# CV\n![Me|width=100px](/data/images/a.png)\ntext ![](b.jpg)";
        let tokens = image_tokens(md);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].alt, "Me|width=100px");
        assert_eq!(tokens[0].url, "/data/images/a.png");
        assert_eq!(&md[tokens[0].range.clone()], "![Me|width=100px](/data/images/a.png)");
        assert_eq!(tokens[1].alt, "");
        assert_eq!(tokens[1].url, "b.jpg");
    }

    #[test]
    fn test_replace_rewrites_only_first_occurrence() {
        let md = "text ![A](u1) more ![A](u1)";
        let result = locate_and_replace_image(md, "u1", set_align_right);
        assert!(result.found);
        assert_eq!(result.new_source, "text ![A|align=right](u1) more ![A](u1)");
    }

    #[test]
    fn test_replace_missing_url_leaves_source_unchanged() {
        let md = "![A](u1)";
        let result = locate_and_replace_image(md, "missing-url", set_align_right);
        assert!(!result.found);
        assert_eq!(result.new_source, md);
    }

    #[test]
    fn test_replace_treats_url_literally() {
        let md = "![a](/img?x=1) ![b](/imgXx=1) ![c](/img.png)";
        let result = set_image_property(md, "/img?x=1", annotation::WIDTH, "10px");
        assert_eq!(
            result.new_source,
            "![a|width=10px](/img?x=1) ![b](/imgXx=1) ![c](/img.png)"
        );

        let result = set_image_property(md, "/img(png", annotation::WIDTH, "10px");
        assert!(!result.found);
    }

    #[test]
    fn test_replace_does_not_swallow_earlier_images() {
        let md = "![A](u2) ![B](u1)";
        let result = locate_and_replace_image(md, "u1", set_align_right);
        assert_eq!(result.new_source, "![A](u2) ![B|align=right](u1)");
    }

    #[test]
    fn test_replace_requires_exact_url() {
        let md = "![A](u10) ![B](u1)";
        let result = set_image_property(md, "u1", annotation::ALIGN, "left");
        assert_eq!(result.new_source, "![A](u10) ![B|align=left](u1)");
    }

    #[test]
    fn test_replace_clearing_last_property_restores_plain_token() {
        let md = "![Photo|width=200px](/p.png)\n";
        let result = set_image_property(md, "/p.png", annotation::WIDTH, "");
        assert_eq!(result.new_source, "![Photo](/p.png)\n");
    }

    #[test]
    fn test_alt_with_bracket_pair_is_matched() {
        let md = "# CV\n\n![Photo [2024]|width=100px](/x/a.png)\n";
        let tokens = image_tokens(md);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].alt, "Photo [2024]|width=100px");

        let result = set_image_property(md, "/x/a.png", annotation::ALIGN, "right");
        assert!(result.found);
        assert_eq!(
            result.new_source,
            "# CV\n\n![Photo [2024]|width=100px|align=right](/x/a.png)\n"
        );
    }

    #[test]
    fn test_stray_bracket_does_not_join_tokens() {
        let md = "![A] and [ ![B](u1)";
        let result = set_image_property(md, "u1", annotation::WIDTH, "5px");
        assert_eq!(result.new_source, "![A] and [ ![B|width=5px](u1)");
    }

    #[test]
    fn test_find_image_alt_returns_raw_alt() {
        let md = "![Photo|x-offset=4](/data/images/p.png)";
        assert_eq!(
            find_image_alt(md, "/data/images/p.png").as_deref(),
            Some("Photo|x-offset=4")
        );
        assert_eq!(find_image_alt(md, "/data/images/q.png"), None);
    }
}
