//! Image annotation micro-syntax.
//!
//! Image metadata lives inside the alt text of a markdown image:
//!
//! ```text
//! ![Profile photo|width=200px|align=left](/data/images/42.png)
//! ```
//!
//! The first `|`-separated segment is the human readable alt text; every
//! later segment is a `key=value` pair. Decoding is permissive: segments
//! that are not `key=value` are dropped without error.

use std::fmt;
use std::str::FromStr;

/// Key holding the image display width (`200px`, `50%`).
pub const WIDTH: &str = "width";
/// Key holding the image alignment (`left`, `center`, `right`).
pub const ALIGN: &str = "align";
/// Horizontal position offset of a profile image.
pub const X_OFFSET: &str = "x-offset";
/// Vertical position offset of a profile image.
pub const Y_OFFSET: &str = "y-offset";

/// Reserved key addressing the alt text itself.
const ALT: &str = "alt";

/// Decoded image annotations: the alt text plus ordered `key=value` pairs.
///
/// Unknown keys are kept so that a decode/encode cycle never loses data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    /// Human readable alternate text.
    pub alt: String,
    properties: Vec<(String, String)>,
}

impl AnnotationSet {
    /// An annotation set with the given alt text and no properties.
    pub fn new(alt: impl Into<String>) -> Self {
        Self {
            alt: alt.into(),
            properties: Vec::new(),
        }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Look up a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == ALT {
            return Some(&self.alt);
        }
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a property, keeping the position of an existing key.
    ///
    /// An empty value is stored as-is and dropped when encoding, which is
    /// how a property gets removed from the alt text.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if key == ALT {
            self.alt = value;
            return;
        }
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.properties.push((key.to_string(), value)),
        }
    }

    /// Remove a property, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.properties.iter().position(|(k, _)| k == key)?;
        Some(self.properties.remove(idx).1)
    }

    /// Properties in insertion order (the alt text is not included).
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when there is nothing besides the alt text.
    pub fn is_plain(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn width(&self) -> Option<&str> {
        self.get(WIDTH).filter(|w| !w.is_empty())
    }

    /// Parsed alignment; unknown values yield `None`.
    pub fn align(&self) -> Option<Align> {
        self.get(ALIGN).and_then(|a| a.parse().ok())
    }
}

/// Image alignment inside the CV body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Align {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(()),
        }
    }
}

/// Decode an alt text that may be missing entirely.
pub fn decode(alt_text: Option<&str>) -> AnnotationSet {
    decode_str(alt_text.unwrap_or_default())
}

/// Decode an alt text into its annotation set. Never fails.
///
/// Each segment after the alt is split on its first `=`, so `note=a=b`
/// yields the value `a=b` and such values survive an encode/decode cycle.
/// Segments without `=`, or with an empty key or value, are dropped.
pub fn decode_str(alt_text: &str) -> AnnotationSet {
    if !alt_text.contains('|') {
        return AnnotationSet::new(alt_text);
    }

    let mut segments = alt_text.split('|');
    let mut set = AnnotationSet::new(segments.next().unwrap_or_default().trim());
    for segment in segments {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if !key.is_empty() && !value.is_empty() {
            set.set(key, value);
        }
    }
    set
}

/// Encode an annotation set back into alt text.
///
/// A set without properties encodes to its bare alt text, with no trailing
/// pipe. Properties with empty values are omitted.
pub fn encode(set: &AnnotationSet) -> String {
    if set.is_plain() {
        return set.alt.clone();
    }
    let mut out = set.alt.clone();
    for (key, value) in set.properties() {
        if value.is_empty() {
            continue;
        }
        out.push('|');
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Add, update or clear (empty `value`) one property of an encoded alt text.
pub fn set_property(alt_text: &str, key: &str, value: &str) -> String {
    let mut set = decode_str(alt_text);
    set.set(key, value);
    encode(&set)
}
