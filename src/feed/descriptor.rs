//! Tag descriptors: the compact mini-language that names what to extract.
//!
//! A descriptor string takes one of four shapes:
//!
//! - `title` / `dc:date` - a plain element
//! - `link+alternate` - an element whose open tag carries `rel="alternate"`
//! - `media:content#url` - an attribute read off a nested element
//! - `channel#version` / `feed#xml:lang` - an attribute read off the container itself
//!
//! Parsing never fails. A blank descriptor (or one with an empty half around its
//! separator) is kept but flagged as skipped, and the extractor refuses to build a
//! pattern for it.

use std::fmt;

/// Container element names that carry feed-level attributes.
pub const CONTAINER_TAGS: [&str; 2] = ["channel", "feed"];

/// Entry block element names that may carry entry-level attributes.
pub const ENTRY_TAGS: [&str; 2] = ["item", "entry"];

/// The shape of a descriptor, with the qualifier it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorKind {
    /// `name`
    Plain,
    /// `name+rel`
    Relation { rel: String },
    /// `name#attrib`, where `name` is a nested element (or the entry block itself)
    ElementAttribute { attrib: String },
    /// `channel#attrib` or `feed#attrib`
    ContainerAttribute { attrib: String },
}

/// A parsed, immutable tag descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDescriptor {
    raw: String,
    name: String,
    kind: DescriptorKind,
    key: String,
    skip: bool,
}

impl TagDescriptor {
    /// Parses a raw descriptor string. Total: malformed input yields a skipped descriptor.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw: String = raw.into();
        let trimmed = raw.trim();

        let (name, kind) = if let Some((name, rel)) = trimmed.split_once('+') {
            (
                name,
                DescriptorKind::Relation {
                    rel: rel.to_string(),
                },
            )
        } else if let Some((name, attrib)) = trimmed.split_once('#') {
            let attrib = attrib.to_string();
            if CONTAINER_TAGS.contains(&name) {
                (name, DescriptorKind::ContainerAttribute { attrib })
            } else {
                (name, DescriptorKind::ElementAttribute { attrib })
            }
        } else {
            (trimmed, DescriptorKind::Plain)
        };

        let qualifier_blank = match &kind {
            DescriptorKind::Plain => false,
            DescriptorKind::Relation { rel } => rel.trim().is_empty(),
            DescriptorKind::ElementAttribute { attrib }
            | DescriptorKind::ContainerAttribute { attrib } => attrib.trim().is_empty(),
        };
        let skip = name.trim().is_empty() || qualifier_blank;

        Self {
            key: output_key(trimmed),
            name: name.to_string(),
            kind,
            skip,
            raw,
        }
    }

    /// The descriptor exactly as it was written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Element name used for matching, namespace prefix included (`dc:date`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DescriptorKind {
        &self.kind
    }

    /// Map key for extracted values (`dc:date` → `dc_date`, `media:content#url` →
    /// `media_content_url`).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// True when the descriptor must not reach the extractor.
    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Attribute name for the two attribute forms.
    pub fn attrib(&self) -> Option<&str> {
        match &self.kind {
            DescriptorKind::ElementAttribute { attrib }
            | DescriptorKind::ContainerAttribute { attrib } => Some(attrib),
            _ => None,
        }
    }

    /// True for `item#…` / `entry#…`, which read the entry block's own attributes.
    pub fn targets_entry_block(&self) -> bool {
        matches!(self.kind, DescriptorKind::ElementAttribute { .. })
            && ENTRY_TAGS.contains(&self.name.as_str())
    }
}

impl fmt::Display for TagDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for TagDescriptor {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for TagDescriptor {
    fn from(raw: String) -> Self {
        Self::parse(raw)
    }
}

/// Derives the output key: namespace and attribute separators become underscores.
/// Case is left untouched (`pubDate` stays `pubDate`).
fn output_key(identifier: &str) -> String {
    identifier.replace([':', '#'], "_")
}
