//! Projection of a parsed [`Feed`] back into RSS 2.0, Atom, or a JSON-ready mapping.
//!
//! Only a fixed subset of keys is emitted for the XML formats. Text is escaped;
//! description, summary, and content go into CDATA sections. RSS dates use RFC 2822,
//! Atom and the mapping use ISO 8601, both of which the parser reads back.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use super::model::{iso8601, Entry, Feed, Fields, Value};
use super::FeedError;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// XML output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Rss2,
    Atom,
}

impl OutputFormat {
    pub fn render(self, feed: &Feed) -> String {
        match self {
            OutputFormat::Rss2 => to_rss2(feed),
            OutputFormat::Atom => to_atom(feed),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rss2" => Ok(OutputFormat::Rss2),
            "atom" => Ok(OutputFormat::Atom),
            _ => Err(FeedError::InvalidArgument {
                requested: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Rss2 => "rss2",
            OutputFormat::Atom => "atom",
        })
    }
}

/// Serializes `feed` in the named format (`rss2` or `atom`, any case).
///
/// # Errors
///
/// [`FeedError::InvalidArgument`] for any other format name.
pub fn to_xml(feed: &Feed, format: &str) -> Result<String, FeedError> {
    Ok(format.parse::<OutputFormat>()?.render(feed))
}

/// RSS 2.0 document for `feed`.
pub fn to_rss2(feed: &Feed) -> String {
    let mut out = vec![
        XML_DECLARATION.to_string(),
        r#"<rss version="2.0">"#.to_string(),
        "<channel>".to_string(),
    ];

    push_text(&mut out, "title", feed.get("title"));
    push_text(&mut out, "link", feed.get("link"));
    push_cdata(&mut out, "description", feed.get("description"));
    push_text(&mut out, "language", feed.get("language"));
    push_rss_date(&mut out, "pubDate", feed.get("pubDate"));
    push_rss_date(&mut out, "lastBuildDate", feed.get("lastBuildDate"));
    push_text(&mut out, "generator", feed.get("generator"));

    for entry in feed.entries() {
        out.push("<item>".to_string());
        push_text(&mut out, "title", entry.get("title"));
        push_text(&mut out, "link", entry.get("link"));
        push_cdata(&mut out, "description", entry.get("description"));
        push_rss_date(&mut out, "pubDate", entry.get("pubDate"));
        push_text(&mut out, "guid", entry.get("guid"));
        push_text(&mut out, "author", entry.get("author"));
        if let Some(categories) = entry.get("category") {
            for category in categories.texts() {
                out.push(element("category", &escape(category)));
            }
        }
        out.push("</item>".to_string());
    }

    out.push("</channel>".to_string());
    out.push("</rss>".to_string());
    out.join("\n")
}

/// Atom 1.0 document for `feed`.
pub fn to_atom(feed: &Feed) -> String {
    let mut out = vec![
        XML_DECLARATION.to_string(),
        format!(r#"<feed xmlns="{ATOM_NAMESPACE}">"#),
    ];

    push_text(&mut out, "title", feed.get("title"));
    if let Some(link) = feed.get("link").and_then(first_text) {
        out.push(format!(r#"<link href="{}" rel="alternate"/>"#, escape(&link)));
    }
    push_text(&mut out, "id", first_of(feed.fields(), &["id", "link"]));
    push_text(
        &mut out,
        "updated",
        first_of(feed.fields(), &["updated", "lastBuildDate", "pubDate"]),
    );
    push_text(&mut out, "subtitle", first_of(feed.fields(), &["subtitle", "description"]));
    push_atom_author(&mut out, feed.get("author"));
    push_text(&mut out, "generator", feed.get("generator"));

    for entry in feed.entries() {
        push_atom_entry(&mut out, entry);
    }

    out.push("</feed>".to_string());
    out.join("\n")
}

fn push_atom_entry(out: &mut Vec<String>, entry: &Entry) {
    out.push("<entry>".to_string());
    push_text(out, "title", entry.get("title"));
    if let Some(link) = entry.get("link").and_then(first_text) {
        out.push(format!(r#"<link href="{}" rel="alternate"/>"#, escape(&link)));
    }
    push_text(out, "id", first_of(entry.fields(), &["id", "guid", "link"]));
    push_text(out, "updated", entry.get("updated"));
    push_text(out, "published", first_of(entry.fields(), &["published", "pubDate"]));
    push_cdata(out, "summary", first_of(entry.fields(), &["summary", "description"]));
    push_cdata(out, "content", entry.get("content"));
    push_atom_author(out, entry.get("author"));
    if let Some(categories) = entry.get("category") {
        for category in categories.texts() {
            out.push(format!(r#"<category term="{}"/>"#, escape(category)));
        }
    }
    out.push("</entry>".to_string());
}

/// Ordered mapping of the feed's fields plus an `items` list, ready for JSON encoding.
/// Timestamps become ISO 8601 strings.
pub fn to_mapping(feed: &Feed) -> serde_json::Value {
    let mut map = fields_to_json(feed.fields());
    let items = feed
        .entries()
        .iter()
        .map(|entry| serde_json::Value::Object(fields_to_json(entry.fields())))
        .collect();
    map.insert("items".to_string(), serde_json::Value::Array(items));
    serde_json::Value::Object(map)
}

/// Pretty-printed JSON of [`to_mapping`].
pub fn to_json(feed: &Feed) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_mapping(feed))
}

fn fields_to_json(fields: &Fields) -> serde_json::Map<String, serde_json::Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), json_value(value)))
        .collect()
}

fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Timestamp(ts) => serde_json::Value::String(iso8601(ts)),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::TextArray(values) => {
            serde_json::Value::Array(values.iter().cloned().map(serde_json::Value::String).collect())
        }
    }
}

// ============================================================================
// Element helpers
// ============================================================================

fn first_of<'f>(fields: &'f Fields, keys: &[&str]) -> Option<&'f Value> {
    keys.iter().find_map(|key| fields.get(*key))
}

/// Text of a value for a single-valued element. Arrays contribute their first item;
/// timestamps render as ISO 8601.
fn first_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Text(s) => Some(Cow::Borrowed(s)),
        Value::TextArray(values) => values.first().map(|s| Cow::Borrowed(s.as_str())),
        Value::Timestamp(ts) => Some(Cow::Owned(iso8601(ts))),
    }
}

fn element(name: &str, body: &str) -> String {
    format!("<{name}>{body}</{name}>")
}

fn push_text(out: &mut Vec<String>, name: &str, value: Option<&Value>) {
    if let Some(text) = value.and_then(first_text) {
        out.push(element(name, &escape(&text)));
    }
}

fn push_cdata(out: &mut Vec<String>, name: &str, value: Option<&Value>) {
    if let Some(text) = value.and_then(first_text) {
        out.push(element(name, &cdata(&text)));
    }
}

fn push_rss_date(out: &mut Vec<String>, name: &str, value: Option<&Value>) {
    match value {
        Some(Value::Timestamp(ts)) => out.push(element(name, &ts.to_rfc2822())),
        other => push_text(out, name, other),
    }
}

fn push_atom_author(out: &mut Vec<String>, value: Option<&Value>) {
    if let Some(name) = value.and_then(first_text) {
        out.push(format!("<author><name>{}</name></author>", escape(&name)));
    }
}

/// Escapes the five XML-reserved characters. The parser decodes exactly these five,
/// so escaped text reads back unchanged.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Wraps `text` in a CDATA section, splitting any `]]>` it contains.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}
