//! Dot-delimited field paths into stored documents.
//!
//! A [`FieldPath`] addresses a (possibly nested) field. Bracketed array
//! indices are folded into the dotted form, so `content.data[2].title` and
//! `content.data.2.title` name the same field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;
use std::fmt;

/// Name of the document identifier field.
pub const ID_FIELD: &str = "_id";

/// A normalised, dot-delimited path into a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(SmolStr);

impl FieldPath {
    /// Parse a path, turning `[n]` index suffixes into `.n` segments and
    /// dropping empty segments.
    pub fn new(path: impl AsRef<str>) -> Self {
        let raw = path.as_ref();
        let mut normalised = String::with_capacity(raw.len());
        let mut segment = String::new();

        let mut flush = |segment: &mut String, out: &mut String| {
            let trimmed = segment.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(trimmed);
            }
            segment.clear();
        };

        for c in raw.chars() {
            match c {
                '.' | '[' | ']' => flush(&mut segment, &mut normalised),
                _ => segment.push(c),
            }
        }
        flush(&mut segment, &mut normalised);

        Self(SmolStr::new(normalised))
    }

    /// The document identifier path.
    pub fn id() -> Self {
        Self(SmolStr::new_static(ID_FIELD))
    }

    /// The path in dotted form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this path is exactly the identifier field.
    pub fn is_identifier(&self) -> bool {
        self.0 == ID_FIELD
    }

    /// Whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    /// Append a segment.
    pub fn join(&self, segment: impl AsRef<str>) -> Self {
        if self.is_empty() {
            Self::new(segment)
        } else {
            Self::new(format!("{}.{}", self.0, segment.as_ref()))
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FieldPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}
