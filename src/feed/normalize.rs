//! Value normalization: turning raw matched text into a [`Value`].
//!
//! Classification runs in a fixed order:
//!
//! 1. date tags parse into a timestamp, falling back to unescaped text,
//! 2. person and schedule tags lose their markup, then unescape,
//! 3. an empty element with attributes yields its `href`,
//! 4. everything else unescapes.
//!
//! "Unescape" here is deliberately narrow. Percent-decoding only fires when the text
//! looks form-encoded. Outside CDATA sections the five predefined XML entities are
//! decoded; CDATA payloads are taken verbatim. The result is trimmed and put into
//! Unicode NFC. Numeric and named HTML references are left as written.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use percent_encoding::percent_decode_str;
use regex::Regex;
use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

use super::extract::attribute_value;
use super::model::Value;

/// Tags whose content is parsed as a date.
pub const DATE_TAGS: &[&str] = &[
    "pubDate",
    "lastBuildDate",
    "published",
    "updated",
    "expirationDate",
    "modified",
    "dc:date",
];

/// Tags whose markup is stripped before unescaping.
pub const STRIP_HTML_TAGS: &[&str] = &["author", "contributor", "skipHours", "skipDays"];

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(amp|lt|gt|quot|apos);").expect("valid regex"));

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid regex")
});

/// Date formats tried after RFC 2822 and RFC 3339, once zone abbreviations have been
/// replaced with numeric offsets.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%a %b %d %H:%M:%S %z %Y",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M %z",
];

/// Formats without any zone; read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%a %b %d %H:%M:%S %Y",
];

/// Zone abbreviations accepted in otherwise non-RFC dates.
const ZONE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("GMT", "+0000"),
    ("UT", "+0000"),
    ("UTC", "+0000"),
    ("Z", "+0000"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
];

/// Normalizes one matched value.
///
/// `tag_name` is the descriptor's element name (`pubDate`, `dc:date`), `attrs` the
/// matched open tag's attribute text when there is one.
pub fn clean(tag_name: &str, attrs: Option<&str>, content: &str) -> Value {
    if DATE_TAGS.contains(&tag_name) {
        return match parse_date(content) {
            Some(ts) => Value::Timestamp(ts),
            None => Value::Text(unescape(content)),
        };
    }

    if STRIP_HTML_TAGS.contains(&tag_name) {
        return Value::Text(unescape(&strip_markup(content)));
    }

    if content.trim().is_empty() {
        if let Some(attrs) = attrs {
            return Value::Text(extract_href(attrs));
        }
    }

    Value::Text(unescape(content))
}

/// Percent-decodes form-encoded text, unwraps CDATA, decodes the five XML entities
/// outside CDATA, trims, and NFC-normalizes.
pub fn unescape(content: &str) -> String {
    let decoded = if looks_form_encoded(content) {
        Cow::Owned(decode_form(content))
    } else {
        Cow::Borrowed(content)
    };
    canonical(decode_text(&decoded).trim())
}

/// Decodes `&amp;`, `&lt;`, `&gt;`, `&quot;` and `&apos;` in one pass, so `&amp;lt;`
/// becomes `&lt;`.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, |caps: &regex::Captures<'_>| match &caps[1] {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        _ => "'",
    })
}

/// Drops CDATA markers. Text outside CDATA sections is entity-decoded; payloads are
/// kept verbatim, and an unterminated section runs to the end.
fn decode_text(text: &str) -> Cow<'_, str> {
    if !text.contains('&') && !text.contains(CDATA_OPEN) && !text.contains(CDATA_CLOSE) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(CDATA_OPEN) {
        out.push_str(&decode_entities(&rest[..open].replace(CDATA_CLOSE, "")));
        let payload = &rest[open + CDATA_OPEN.len()..];
        match payload.find(CDATA_CLOSE) {
            Some(close) => {
                out.push_str(&payload[..close]);
                rest = &payload[close + CDATA_CLOSE.len()..];
            }
            None => {
                out.push_str(payload);
                rest = "";
            }
        }
    }
    out.push_str(&decode_entities(&rest.replace(CDATA_CLOSE, "")));
    Cow::Owned(out)
}

/// The `href` attribute value from an attribute string, or `""`.
pub fn extract_href(attrs: &str) -> String {
    if let Some(value) = attribute_value(attrs, "href") {
        return canonical(&decode_entities(value.trim()));
    }
    HREF.captures(attrs)
        .and_then(|caps| caps.get(1).or(caps.get(2)).or(caps.get(3)))
        .map(|m| canonical(&decode_entities(m.as_str().trim())))
        .unwrap_or_default()
}

/// Removes every tag, after unwrapping CDATA so wrapped markup is stripped too.
pub fn strip_markup(content: &str) -> String {
    MARKUP.replace_all(&strip_cdata(content), "").into_owned()
}

fn strip_cdata(text: &str) -> Cow<'_, str> {
    if text.contains(CDATA_OPEN) || text.contains(CDATA_CLOSE) {
        Cow::Owned(text.replace(CDATA_OPEN, "").replace(CDATA_CLOSE, ""))
    } else {
        Cow::Borrowed(text)
    }
}

/// NFC form of `text`.
pub fn canonical(text: &str) -> String {
    match is_nfc_quick(text.chars()) {
        IsNormalized::Yes => text.to_string(),
        _ => text.nfc().collect(),
    }
}

/// Characters that legitimately precede `%` in a URI.
fn is_uri_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_.!~*'();/?:@&=+$,[]".contains(c)
}

/// True when a valid `%XX` escape follows a character that could not appear in a URI.
///
/// Text such as `50%` or `?q=a%20b` stays as written; `caf\u{e9} %C3%A9` decodes.
fn looks_form_encoded(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut prev: Option<char> = None;
    for (i, c) in text.char_indices() {
        if c == '%'
            && prev.is_some_and(|p| !is_uri_char(p))
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
        {
            return true;
        }
        prev = Some(c);
    }
    false
}

fn decode_form(text: &str) -> String {
    let spaced = text.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Parses a feed date leniently.
///
/// Tries RFC 2822 (also with a mismatched weekday dropped), RFC 3339, a set of common
/// variants with zone abbreviations, and finally zone-less forms read as UTC.
pub fn parse_date(content: &str) -> Option<DateTime<FixedOffset>> {
    let unwrapped = strip_cdata(content);
    let text = unwrapped.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc2822(text) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }
    if let Some((_, rest)) = text.split_once(',') {
        if let Ok(ts) = DateTime::parse_from_rfc2822(rest.trim()) {
            return Some(ts);
        }
    }

    let zoned = with_numeric_zone(text);
    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&zoned, fmt).ok())
    {
        return Some(ts);
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(naive.and_utc().fixed_offset());
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Replaces a zone abbreviation token (or a trailing ISO `Z`) with its numeric offset.
fn with_numeric_zone(text: &str) -> String {
    if let Some(head) = text.strip_suffix('Z').filter(|head| head.contains('T')) {
        return format!("{head}+0000");
    }
    text.split_whitespace()
        .map(|token| {
            ZONE_ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| token.eq_ignore_ascii_case(abbr))
                .map_or(token, |(_, offset)| *offset)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
