//! The extraction schema: which feed-level and entry-level tags to look for.
//!
//! A [`Schema`] is a plain value passed to [`crate::feed::parse_with_schema`]. For
//! convenience there is also a process-wide default, read by [`crate::feed::parse`]
//! and mutable through the free functions in this module. Every parse takes a
//! snapshot of the default, so mutating it never changes an already-built feed.
//! Callers that mutate the default while other threads parse get no ordering
//! guarantee between the two; pass an explicit schema instead.

use std::sync::{OnceLock, PoisonError, RwLock};

use super::descriptor::TagDescriptor;

/// Feed-level tags known out of the box.
pub const DEFAULT_FEED_TAGS: &[&str] = &[
    "id",
    "title",
    "subtitle",
    "link",
    "description",
    "author",
    "webMaster",
    "managingEditor",
    "contributor",
    "pubDate",
    "lastBuildDate",
    "updated",
    "dc:date",
    "generator",
    "language",
    "docs",
    "cloud",
    "ttl",
    "skipHours",
    "skipDays",
    "image",
    "logo",
    "icon",
    "rating",
    "rights",
    "copyright",
    "textInput",
    "feedburner:browserFriendly",
    "itunes:author",
    "itunes:category",
];

/// Entry-level tags known out of the box.
pub const DEFAULT_ITEM_TAGS: &[&str] = &[
    "id",
    "title",
    "link",
    "link+alternate",
    "link+self",
    "link+edit",
    "link+replies",
    "author",
    "contributor",
    "description",
    "summary",
    "content",
    "content:encoded",
    "comments",
    "pubDate",
    "published",
    "updated",
    "expirationDate",
    "modified",
    "dc:date",
    "category",
    "guid",
    "trackback:ping",
    "trackback:about",
    "dc:creator",
    "dc:title",
    "dc:subject",
    "dc:rights",
    "dc:publisher",
    "feedburner:origLink",
    "media:content#url",
    "media:content#type",
    "media:content#height",
    "media:content#width",
    "media:content#duration",
    "media:title",
    "media:thumbnail#url",
    "media:thumbnail#height",
    "media:thumbnail#width",
    "media:credit",
    "media:credit#role",
    "media:category",
    "media:category#scheme",
];

/// Two ordered descriptor lists. Order sets output key order, not extraction priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    feed_tags: Vec<TagDescriptor>,
    item_tags: Vec<TagDescriptor>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(
            DEFAULT_FEED_TAGS.iter().copied(),
            DEFAULT_ITEM_TAGS.iter().copied(),
        )
    }
}

impl Schema {
    pub fn new<F, I>(feed_tags: F, item_tags: I) -> Self
    where
        F: IntoIterator,
        F::Item: Into<TagDescriptor>,
        I: IntoIterator,
        I::Item: Into<TagDescriptor>,
    {
        Self {
            feed_tags: feed_tags.into_iter().map(Into::into).collect(),
            item_tags: item_tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn feed_tags(&self) -> &[TagDescriptor] {
        &self.feed_tags
    }

    pub fn item_tags(&self) -> &[TagDescriptor] {
        &self.item_tags
    }

    pub fn set_feed_tags<T>(&mut self, tags: impl IntoIterator<Item = T>)
    where
        T: Into<TagDescriptor>,
    {
        self.feed_tags = tags.into_iter().map(Into::into).collect();
    }

    pub fn set_item_tags<T>(&mut self, tags: impl IntoIterator<Item = T>)
    where
        T: Into<TagDescriptor>,
    {
        self.item_tags = tags.into_iter().map(Into::into).collect();
    }

    pub fn push_feed_tag(&mut self, tag: impl Into<TagDescriptor>) {
        self.feed_tags.push(tag.into());
    }

    pub fn push_item_tag(&mut self, tag: impl Into<TagDescriptor>) {
        self.item_tags.push(tag.into());
    }

    /// Removes every feed tag written exactly as `raw`. Returns true if any was removed.
    pub fn remove_feed_tag(&mut self, raw: &str) -> bool {
        let before = self.feed_tags.len();
        self.feed_tags.retain(|d| d.raw() != raw);
        before != self.feed_tags.len()
    }

    /// Removes every item tag written exactly as `raw`. Returns true if any was removed.
    pub fn remove_item_tag(&mut self, raw: &str) -> bool {
        let before = self.item_tags.len();
        self.item_tags.retain(|d| d.raw() != raw);
        before != self.item_tags.len()
    }
}

static DEFAULT_SCHEMA: OnceLock<RwLock<Schema>> = OnceLock::new();

fn default_cell() -> &'static RwLock<Schema> {
    DEFAULT_SCHEMA.get_or_init(|| RwLock::new(Schema::default()))
}

/// Snapshot of the process-wide default schema.
pub fn default_schema() -> Schema {
    default_cell()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replaces the process-wide default schema.
pub fn set_default_schema(schema: Schema) {
    *default_cell()
        .write()
        .unwrap_or_else(PoisonError::into_inner) = schema;
}

/// Mutates the process-wide default schema in place under its write lock.
pub fn update_default_schema<R>(f: impl FnOnce(&mut Schema) -> R) -> R {
    let mut guard = default_cell()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

/// Raw feed-tag strings of the default schema, in order.
pub fn feed_tags() -> Vec<String> {
    default_schema()
        .feed_tags()
        .iter()
        .map(|d| d.raw().to_string())
        .collect()
}

/// Replaces the feed-tag list of the default schema.
pub fn set_feed_tags<T: Into<TagDescriptor>>(tags: impl IntoIterator<Item = T>) {
    update_default_schema(|s| s.set_feed_tags(tags));
}

/// Raw item-tag strings of the default schema, in order.
pub fn item_tags() -> Vec<String> {
    default_schema()
        .item_tags()
        .iter()
        .map(|d| d.raw().to_string())
        .collect()
}

/// Replaces the item-tag list of the default schema.
pub fn set_item_tags<T: Into<TagDescriptor>>(tags: impl IntoIterator<Item = T>) {
    update_default_schema(|s| s.set_item_tags(tags));
}
