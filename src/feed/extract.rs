//! Element extraction over loosely structured markup.
//!
//! This is not an XML parser. Each tag name gets two tokens, an open tag and a close
//! tag, compiled with the `regex` crate (finite automata, linear in the input) and
//! memoized in a bounded LRU cache. A small scanner on top of those tokens finds:
//!
//! 1. the first paired `<name …>…</name>` element whose open tag passes the
//!    descriptor's filter, with minimal content between open and close, then
//! 2. failing that, the first self-closing `<name …/>` element passing the filter.
//!
//! Tag names and the optional `rss:` / `atom:` prefix match case-insensitively.
//! Every scan is linear: once a close-tag search for a name fails, no later open tag
//! of that name can close either, so the attempt ends there.

use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock, Mutex, OnceLock, PoisonError};

use lru::LruCache;
use regex::{Match, Regex, RegexBuilder};

use super::descriptor::{DescriptorKind, TagDescriptor, CONTAINER_TAGS, ENTRY_TAGS};

/// Optional namespace prefix accepted in front of any tag name.
const NAMESPACE_PREFIX: &str = "(?:rss:|atom:)?";

/// Number of distinct tag names whose compiled patterns are kept.
const PATTERN_CACHE_CAPACITY: usize = 256;

static PATTERN_CACHE: OnceLock<Mutex<LruCache<String, Arc<TagPatterns>>>> = OnceLock::new();

static CONTAINER_PATTERNS: LazyLock<TagPatterns> =
    LazyLock::new(|| TagPatterns::compile(&CONTAINER_TAGS).expect("valid regex"));

static ENTRY_PATTERNS: LazyLock<TagPatterns> =
    LazyLock::new(|| TagPatterns::compile(&ENTRY_TAGS).expect("valid regex"));

/// What a descriptor matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted<'a> {
    /// Attribute text of the matched open tag. `None` when the value is itself an
    /// attribute value.
    pub attrs: Option<&'a str>,
    /// Inner content of a paired element, `""` for a self-closing one, or the
    /// attribute value for the attribute forms.
    pub content: &'a str,
}

/// The `<channel>` or `<feed>` container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Container<'a> {
    pub name: &'a str,
    pub attrs: &'a str,
}

/// An `<item>` or `<entry>` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    pub name: &'a str,
    pub attrs: &'a str,
    pub body: &'a str,
    /// Byte offset of the block's open tag in the scanned text.
    pub start: usize,
}

#[derive(Debug, Clone, Copy)]
struct OpenTag<'t> {
    name: &'t str,
    attrs: &'t str,
    self_closing: bool,
    start: usize,
    end: usize,
}

struct TagPatterns {
    open: Regex,
    close: Regex,
}

impl TagPatterns {
    fn compile(names: &[&str]) -> Result<Self, regex::Error> {
        let alternation = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let open = RegexBuilder::new(&format!(
            r"<{NAMESPACE_PREFIX}({alternation})((?:\s[^>]*)?/?)>"
        ))
        .case_insensitive(true)
        .build()?;
        let close = RegexBuilder::new(&format!(r"</{NAMESPACE_PREFIX}({alternation})\s*>"))
            .case_insensitive(true)
            .build()?;
        Ok(Self { open, close })
    }

    fn next_open<'t>(&self, text: &'t str, from: usize) -> Option<OpenTag<'t>> {
        let caps = self.open.captures_at(text, from)?;
        let whole = caps.get(0)?;
        let raw_attrs = caps.get(2).map_or("", |m| m.as_str());
        let (attrs, self_closing) = match raw_attrs.trim_end().strip_suffix('/') {
            Some(attrs) => (attrs, true),
            None => (raw_attrs, false),
        };
        Some(OpenTag {
            name: caps.get(1)?.as_str(),
            attrs,
            self_closing,
            start: whole.start(),
            end: whole.end(),
        })
    }

    /// First close tag for `name` at or after `from`.
    fn close_after<'t>(&self, text: &'t str, name: &str, from: usize) -> Option<Match<'t>> {
        let mut pos = from;
        while let Some(caps) = self.close.captures_at(text, pos) {
            let whole = caps.get(0)?;
            if caps.get(1).is_some_and(|m| same_name(m.as_str(), name)) {
                return Some(whole);
            }
            pos = whole.end();
        }
        None
    }

    /// First paired element whose open tag `select` accepts.
    fn first_paired<'t, T>(
        &self,
        text: &'t str,
        mut select: impl FnMut(&'t str) -> Option<T>,
    ) -> Option<(T, &'t str)> {
        let mut pos = 0;
        while let Some(open) = self.next_open(text, pos) {
            pos = open.end;
            if open.self_closing {
                continue;
            }
            let Some(selected) = select(open.attrs) else {
                continue;
            };
            let close = self.close_after(text, open.name, open.end)?;
            return Some((selected, &text[open.end..close.start()]));
        }
        None
    }

    /// First self-closing element whose open tag `select` accepts.
    fn first_self_closing<'t, T>(
        &self,
        text: &'t str,
        mut select: impl FnMut(&'t str) -> Option<T>,
    ) -> Option<T> {
        let mut pos = 0;
        while let Some(open) = self.next_open(text, pos) {
            pos = open.end;
            if !open.self_closing {
                continue;
            }
            if let Some(selected) = select(open.attrs) {
                return Some(selected);
            }
        }
        None
    }

    /// Every non-overlapping paired element, in document order.
    fn all_paired<'t>(&self, text: &'t str) -> Vec<(OpenTag<'t>, &'t str)> {
        let mut found = Vec::new();
        // Names whose close tag no longer occurs past the cursor.
        let mut exhausted: Vec<&str> = Vec::new();
        let mut pos = 0;
        while let Some(open) = self.next_open(text, pos) {
            pos = open.end;
            if open.self_closing || exhausted.iter().any(|n| same_name(n, open.name)) {
                continue;
            }
            match self.close_after(text, open.name, open.end) {
                Some(close) => {
                    found.push((open, &text[open.end..close.start()]));
                    pos = close.end();
                }
                None => exhausted.push(open.name),
            }
        }
        found
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Compiled patterns for one tag name, or `None` for a blank name.
fn patterns_for(name: &str) -> Option<Arc<TagPatterns>> {
    if name.trim().is_empty() {
        return None;
    }

    let cache = PATTERN_CACHE.get_or_init(|| {
        let capacity = NonZeroUsize::new(PATTERN_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Mutex::new(LruCache::new(capacity))
    });
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(patterns) = cache.get(name) {
        return Some(Arc::clone(patterns));
    }

    match TagPatterns::compile(&[name]) {
        Ok(patterns) => {
            tracing::debug!(tag = %name, "Compiled tag patterns");
            let patterns = Arc::new(patterns);
            cache.put(name.to_string(), Arc::clone(&patterns));
            Some(patterns)
        }
        Err(e) => {
            tracing::warn!(tag = %name, error = %e, "Could not build tag pattern, skipping");
            None
        }
    }
}

/// Extracts the first match for `descriptor` from `text`.
///
/// `owner_attrs` is the attribute text of the element that owns `text`: the
/// container for feed-level lookups, the entry block for entry-level ones. It is
/// read directly for container attributes and for `item#…` / `entry#…` descriptors.
///
/// Skipped (blank) descriptors return `None` before any pattern is built.
pub fn extract<'a>(
    text: &'a str,
    descriptor: &TagDescriptor,
    owner_attrs: Option<&'a str>,
) -> Option<Extracted<'a>> {
    if descriptor.is_skipped() {
        return None;
    }

    let as_value = |content: &'a str| Extracted {
        attrs: None,
        content,
    };

    match descriptor.kind() {
        DescriptorKind::ContainerAttribute { attrib } => {
            owner_attrs.and_then(|attrs| attribute_value(attrs, attrib)).map(as_value)
        }
        DescriptorKind::ElementAttribute { attrib }
            if descriptor.targets_entry_block() && owner_attrs.is_some() =>
        {
            owner_attrs.and_then(|attrs| attribute_value(attrs, attrib)).map(as_value)
        }
        DescriptorKind::ElementAttribute { attrib } => {
            let patterns = patterns_for(descriptor.name())?;
            let select = |attrs: &'a str| attribute_value(attrs, attrib);
            match patterns.first_paired(text, select) {
                Some((value, _)) => Some(as_value(value)),
                None => patterns.first_self_closing(text, select).map(as_value),
            }
        }
        DescriptorKind::Plain => element(text, descriptor.name(), |attrs| Some(attrs)),
        DescriptorKind::Relation { rel } => element(text, descriptor.name(), |attrs| {
            attribute_value(attrs, "rel")
                .is_some_and(|value| value.trim().eq_ignore_ascii_case(rel.trim()))
                .then_some(attrs)
        }),
    }
}

fn element<'a>(
    text: &'a str,
    name: &str,
    select: impl FnMut(&'a str) -> Option<&'a str> + Copy,
) -> Option<Extracted<'a>> {
    let patterns = patterns_for(name)?;
    if let Some((attrs, content)) = patterns.first_paired(text, select) {
        return Some(Extracted {
            attrs: Some(attrs),
            content,
        });
    }
    patterns
        .first_self_closing(text, select)
        .map(|attrs| Extracted {
            attrs: Some(attrs),
            content: "",
        })
}

/// Inner content of every paired `name` element in `text`, in document order.
/// Self-closing occurrences are not collected.
pub fn extract_all<'a>(text: &'a str, descriptor: &TagDescriptor) -> Vec<&'a str> {
    if descriptor.is_skipped() {
        return Vec::new();
    }
    let Some(patterns) = patterns_for(descriptor.name()) else {
        return Vec::new();
    };
    patterns
        .all_paired(text)
        .into_iter()
        .map(|(_, body)| body)
        .collect()
}

/// Finds the first `<channel>` / `<feed>` open tag that has a container close tag
/// somewhere after it.
pub fn find_container(text: &str) -> Option<Container<'_>> {
    let patterns = &*CONTAINER_PATTERNS;
    let mut pos = 0;
    while let Some(open) = patterns.next_open(text, pos) {
        pos = open.end;
        if open.self_closing {
            continue;
        }
        // Any container close counts; mismatched pairs are tolerated.
        return patterns
            .close
            .is_match_at(text, open.end)
            .then_some(Container {
                name: open.name,
                attrs: open.attrs,
            });
    }
    None
}

/// Length of the header region: the text before the first `<item>` / `<entry>` open
/// tag, or the whole text when there is none.
pub fn header_len(text: &str) -> usize {
    ENTRY_PATTERNS
        .next_open(text, 0)
        .map_or(text.len(), |open| open.start)
}

/// Every non-overlapping `<item>…</item>` / `<entry>…</entry>` block, in order.
pub fn entry_blocks(text: &str) -> Vec<Block<'_>> {
    ENTRY_PATTERNS
        .all_paired(text)
        .into_iter()
        .map(|(open, body)| Block {
            name: open.name,
            attrs: open.attrs,
            body,
            start: open.start,
        })
        .collect()
}

/// Reads `name="value"` (or single-quoted) from an attribute string.
///
/// The attribute name matches case-insensitively and must start the string or follow
/// whitespace, so `url` does not match inside `xurl="…"` or `media:url="…"`.
pub fn attribute_value<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    // ASCII lowercasing keeps byte offsets identical to `attrs`.
    let haystack = attrs.to_ascii_lowercase();
    let needle: Cow<'_, str> = if name.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(name.to_ascii_lowercase())
    } else {
        Cow::Borrowed(name)
    };
    let bytes = attrs.as_bytes();

    let mut from = 0;
    while let Some(found) = haystack[from..].find(needle.as_ref()) {
        let start = from + found;
        let after = start + needle.len();
        from = after;

        if start > 0 && !bytes[start - 1].is_ascii_whitespace() {
            continue;
        }
        let Some(rest) = attrs[after..].trim_start().strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let inner = &rest[1..];
        return inner.find(quote).map(|end| &inner[..end]);
    }
    None
}
