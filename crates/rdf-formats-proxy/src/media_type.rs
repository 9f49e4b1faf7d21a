//! Media type normalization and ordered media type lists
//!
//! A [`MediaType`] is always the bare `type/subtype` part of a header value:
//! parameters (`;charset=...`, `;q=...`) are stripped on construction.
//! [`MediaTypeList`] keeps first-occurrence order and drops duplicates, since
//! order encodes preference everywhere it is used.

use std::fmt;

/// A normalized media type identifier such as `text/n3`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// Normalize a raw header value, dropping parameters and surrounding
    /// whitespace. Returns `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let essence = raw.split(';').next().unwrap_or_default().trim();
        if essence.is_empty() {
            None
        } else {
            Some(Self(essence.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for MediaType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MediaType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Ordered, de-duplicated list of media types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaTypeList(Vec<MediaType>);

impl MediaTypeList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Split an `Accept` header on `,` and normalize each entry.
    ///
    /// Quality values are discarded, not weighted: the first listed entry is
    /// the most preferred one.
    pub fn from_accept(header: &str) -> Self {
        header.split(',').filter_map(MediaType::parse).collect()
    }

    /// Append `media_type` unless it is already present
    pub fn push(&mut self, media_type: MediaType) {
        if !self.contains(&media_type) {
            self.0.push(media_type);
        }
    }

    pub fn contains(&self, media_type: &MediaType) -> bool {
        self.0.iter().any(|m| m == media_type)
    }

    /// Concatenate `self` and `other`, keeping the first occurrence of each
    /// entry.
    pub fn union(&self, other: &MediaTypeList) -> MediaTypeList {
        self.iter().chain(other.iter()).cloned().collect()
    }

    /// Entries of `self` that are also in `other`, in `self`'s order
    pub fn intersect(&self, other: &MediaTypeList) -> MediaTypeList {
        self.iter().filter(|m| other.contains(m)).cloned().collect()
    }

    pub fn first(&self) -> Option<&MediaType> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaType> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a header value (`a/b, c/d`)
    pub fn to_header_value(&self) -> String {
        self.0
            .iter()
            .map(MediaType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<MediaType> for MediaTypeList {
    fn from_iter<I: IntoIterator<Item = MediaType>>(iter: I) -> Self {
        let mut list = MediaTypeList::new();
        for media_type in iter {
            list.push(media_type);
        }
        list
    }
}

impl IntoIterator for MediaTypeList {
    type Item = MediaType;
    type IntoIter = std::vec::IntoIter<MediaType>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a MediaTypeList {
    type Item = &'a MediaType;
    type IntoIter = std::slice::Iter<'a, MediaType>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
