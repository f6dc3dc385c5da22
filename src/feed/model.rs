//! The normalized feed model: [`Value`], [`Entry`], and [`Feed`].
//!
//! Both the feed and each entry keep their fields in an insertion-ordered map keyed
//! by the descriptor's output key. Lookups of keys that were never extracted simply
//! return `None`; there is no per-feed generated accessor surface.

use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// A single extracted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A parsed date, keeping the offset it was written with.
    Timestamp(DateTime<FixedOffset>),
    /// Normalized UTF-8 text.
    Text(String),
    /// Every occurrence of an array tag, in document order. Never empty.
    TextArray(Vec<String>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            Value::TextArray(values) => Some(values),
            _ => None,
        }
    }

    /// Text values as a slice of strings: one for `Text`, all for `TextArray`,
    /// none for `Timestamp`.
    pub fn texts(&self) -> &[String] {
        match self {
            Value::Text(s) => std::slice::from_ref(s),
            Value::TextArray(values) => values,
            Value::Timestamp(_) => &[],
        }
    }
}

/// ISO 8601 rendering used by the Atom output and the JSON mapping (`Z` for UTC).
pub fn iso8601(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Timestamp(ts) => f.write_str(&iso8601(ts)),
            Value::Text(s) => f.write_str(s),
            Value::TextArray(values) => f.write_str(&values.join(", ")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Timestamp(ts) => serializer.serialize_str(&iso8601(ts)),
            Value::Text(s) => serializer.serialize_str(s),
            Value::TextArray(values) => values.serialize(serializer),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(ts)
    }
}

/// Ordered key → value fields shared by [`Entry`] and [`Feed`].
pub type Fields = IndexMap<String, Value>;

macro_rules! field_accessors {
    () => {
        /// Value stored under `key`, if the tag was found.
        pub fn get(&self, key: &str) -> Option<&Value> {
            self.fields.get(key)
        }

        /// Text stored under `key`. `None` if absent or not plain text.
        pub fn text(&self, key: &str) -> Option<&str> {
            self.get(key).and_then(Value::as_text)
        }

        /// Timestamp stored under `key`. `None` if absent or not a parsed date.
        pub fn timestamp(&self, key: &str) -> Option<&DateTime<FixedOffset>> {
            self.get(key).and_then(Value::as_timestamp)
        }

        pub fn contains_key(&self, key: &str) -> bool {
            self.fields.contains_key(key)
        }

        /// All fields in schema order.
        pub fn fields(&self) -> &Fields {
            &self.fields
        }

        pub fn keys(&self) -> impl Iterator<Item = &str> {
            self.fields.keys().map(String::as_str)
        }

        pub fn title(&self) -> Option<&str> {
            self.text("title")
        }

        pub fn link(&self) -> Option<&str> {
            self.text("link")
        }

        pub fn description(&self) -> Option<&str> {
            self.text("description")
        }
    };
}

/// One `<item>` / `<entry>` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Entry {
    fields: Fields,
}

impl Entry {
    pub fn new(fields: Fields) -> Self {
        Self { fields }
    }

    field_accessors!();

    /// The date `latest` sorts by: `pubDate`, else `updated`.
    pub fn sort_date(&self) -> Option<&DateTime<FixedOffset>> {
        self.timestamp("pubDate").or_else(|| self.timestamp("updated"))
    }
}

/// A parsed feed: feed-level fields, the ordered entries, and the conditional-GET
/// tokens that only the fetcher sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    fields: Fields,
    entries: Vec<Entry>,
    etag: Option<String>,
    last_modified: Option<String>,
}

impl Feed {
    pub fn new(fields: Fields, entries: Vec<Entry>) -> Self {
        Self {
            fields,
            entries,
            etag: None,
            last_modified: None,
        }
    }

    field_accessors!();

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// RSS naming for [`Feed::entries`].
    pub fn items(&self) -> &[Entry] {
        &self.entries
    }

    /// Entry at `index` in document order; `None` when out of range.
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// The `count` most recent entries, newest first.
    ///
    /// Entries sort by `pubDate`, falling back to `updated`; entries with neither
    /// sort last. Entries with equal dates keep their document order.
    pub fn latest(&self, count: usize) -> Vec<&Entry> {
        let mut sorted: Vec<&Entry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.sort_date().cmp(&a.sort_date()));
        sorted.truncate(count);
        sorted
    }

    /// `ETag` of the response this feed was fetched from.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// `Last-Modified` of the response this feed was fetched from.
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }

    pub(crate) fn set_cache_tokens(&mut self, etag: Option<String>, last_modified: Option<String>) {
        self.etag = etag;
        self.last_modified = last_modified;
    }
}

impl<'a> IntoIterator for &'a Feed {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> Value {
        Value::Timestamp(FixedOffset::east_opt(0).unwrap().timestamp_opt(secs, 0).unwrap())
    }

    fn entry(pairs: &[(&str, Value)]) -> Entry {
        Entry::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let e = entry(&[("title", "Hello".into())]);
        assert_eq!(e.title(), Some("Hello"));
        assert_eq!(e.get("full_text"), None);
        assert_eq!(e.link(), None);
        assert_eq!(e.get("title"), Some(&Value::Text("Hello".into())));
        assert!(!e.contains_key("full_text"));
    }

    #[test]
    fn test_latest_orders_and_keeps_ties_stable() {
        let feed = Feed::new(
            Fields::new(),
            vec![
                entry(&[("title", "none".into())]),
                entry(&[("title", "old".into()), ("pubDate", ts(100))]),
                entry(&[("title", "tie-a".into()), ("updated", ts(500))]),
                entry(&[("title", "tie-b".into()), ("pubDate", ts(500))]),
                entry(&[("title", "bad".into()), ("pubDate", "yesterday".into())]),
            ],
        );
        let titles: Vec<_> = feed.latest(10).iter().filter_map(|e| e.title()).collect();
        assert_eq!(titles, ["tie-a", "tie-b", "old", "none", "bad"]);
        assert_eq!(feed.latest(2).len(), 2);
        assert!(feed.latest(0).is_empty());
    }

    #[test]
    fn test_entry_index_out_of_range() {
        let feed = Feed::new(Fields::new(), vec![Entry::default()]);
        assert!(feed.entry(0).is_some());
        assert!(feed.entry(1).is_none());
        assert_eq!(feed.iter().count(), 1);
        assert_eq!((&feed).into_iter().count(), 1);
    }

    #[test]
    fn test_value_serializes_timestamp_as_iso8601() {
        let json = serde_json::to_string(&ts(1_124_890_414)).unwrap();
        assert_eq!(json, "\"2005-08-24T13:33:34Z\"");

        let json = serde_json::to_string(&Value::TextArray(vec!["a".into(), "b".into()])).unwrap();
        assert_eq!(json, "[\"a\",\"b\"]");
    }

    #[test]
    fn test_cache_tokens_default_to_none() {
        let mut feed = Feed::default();
        assert_eq!(feed.etag(), None);
        assert_eq!(feed.last_modified(), None);
        feed.set_cache_tokens(Some("\"abc\"".into()), None);
        assert_eq!(feed.etag(), Some("\"abc\""));
    }
}
