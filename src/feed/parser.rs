use std::collections::HashSet;
use std::io::Read;

use super::descriptor::{DescriptorKind, TagDescriptor};
use super::extract::{self, Block, Container};
use super::model::{iso8601, Entry, Feed, Fields, Value};
use super::normalize::clean;
use super::schema::{default_schema, Schema};
use super::FeedError;
use crate::util::decode_source;

/// Per-call parse options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Item tags collected as [`Value::TextArray`] instead of a single value. Matched
    /// against the descriptor as written, its element name, or its output key.
    pub array_tags: HashSet<String>,
}

impl ParseOptions {
    pub fn with_array_tag(mut self, tag: impl Into<String>) -> Self {
        self.array_tags.insert(tag.into());
        self
    }

    /// True when `descriptor` should be collected as an array. Only plain element
    /// descriptors can be.
    fn is_array(&self, descriptor: &TagDescriptor) -> bool {
        matches!(descriptor.kind(), DescriptorKind::Plain)
            && [descriptor.raw().trim(), descriptor.name(), descriptor.key()]
                .iter()
                .any(|candidate| self.array_tags.contains(*candidate))
    }
}

/// Parses a feed with a snapshot of the process-wide default schema.
///
/// # Errors
///
/// Returns [`FeedError::Format`] when the source has no `<channel>` / `<feed>`
/// container. Everything short of that parses, with whatever tags matched.
pub fn parse(source: impl AsRef<[u8]>, options: &ParseOptions) -> Result<Feed, FeedError> {
    parse_with_schema(source, &default_schema(), options)
}

/// Reads `reader` to the end, then parses it like [`parse`].
pub fn parse_reader<R: Read>(mut reader: R, options: &ParseOptions) -> Result<Feed, FeedError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse(bytes, options)
}

/// Parses a feed with an explicit schema.
pub fn parse_with_schema(
    source: impl AsRef<[u8]>,
    schema: &Schema,
    options: &ParseOptions,
) -> Result<Feed, FeedError> {
    let document = decode_source(source.as_ref());
    let document: &str = &document;

    let container = extract::find_container(document).ok_or(FeedError::Format)?;
    let header = &document[..extract::header_len(document)];

    let fields = feed_fields(document, header, &container, schema.feed_tags());

    let entries: Vec<Entry> = extract::entry_blocks(document)
        .iter()
        .map(|block| entry_fields(block, schema.item_tags(), options))
        .map(Entry::new)
        .collect();

    tracing::debug!(
        container = container.name,
        feed_fields = fields.len(),
        entries = entries.len(),
        "Parsed feed"
    );

    Ok(Feed::new(fields, entries))
}

fn feed_fields(
    document: &str,
    header: &str,
    container: &Container<'_>,
    descriptors: &[TagDescriptor],
) -> Fields {
    let mut fields = Fields::new();
    for descriptor in active(descriptors) {
        let found = match descriptor.kind() {
            DescriptorKind::ContainerAttribute { .. } => {
                extract::extract("", descriptor, Some(container.attrs))
            }
            _ => extract::extract(header, descriptor, None)
                .or_else(|| extract::extract(document, descriptor, None)),
        };
        if let Some(found) = found {
            fields.insert(
                descriptor.key().to_string(),
                clean(descriptor.name(), found.attrs, found.content),
            );
        }
    }
    fields
}

fn entry_fields(block: &Block<'_>, descriptors: &[TagDescriptor], options: &ParseOptions) -> Fields {
    let mut fields = Fields::new();
    for descriptor in active(descriptors) {
        if options.is_array(descriptor) {
            let values: Vec<String> = extract::extract_all(block.body, descriptor)
                .into_iter()
                .map(|body| into_text(clean(descriptor.name(), None, body)))
                .collect();
            if !values.is_empty() {
                fields.insert(descriptor.key().to_string(), Value::TextArray(values));
            }
            continue;
        }

        // Container attributes belong to the feed, never to an entry.
        let owner = match descriptor.kind() {
            DescriptorKind::ContainerAttribute { .. } => None,
            _ => Some(block.attrs),
        };
        if let Some(found) = extract::extract(block.body, descriptor, owner) {
            fields.insert(
                descriptor.key().to_string(),
                clean(descriptor.name(), found.attrs, found.content),
            );
        }
    }
    fields
}

/// Flattens a cleaned value into one array element.
fn into_text(value: Value) -> String {
    match value {
        Value::Text(text) => text,
        Value::Timestamp(ts) => iso8601(&ts),
        Value::TextArray(values) => values.join(" "),
    }
}

fn active(descriptors: &[TagDescriptor]) -> impl Iterator<Item = &TagDescriptor> {
    descriptors.iter().filter(|descriptor| {
        if descriptor.is_skipped() {
            tracing::debug!(descriptor = %descriptor.raw(), "Skipping blank tag descriptor");
            false
        } else {
            true
        }
    })
}
