//! Integration tests: parsing real-world feed fixtures with the default schema.
//!
//! Fixtures live in `tests/fixtures/`. Nothing in this file mutates the process-wide
//! default schema; attribute-form lookups use an explicit `Schema` instead.

use chrono::DateTime;
use feedscan::feed::{parse, parse_with_schema, FeedError, ParseOptions, Schema, Value};
use pretty_assertions::assert_eq;
use std::path::Path;

fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("fixture {}: {e}", path.display()))
}

fn parse_fixture(name: &str) -> feedscan::feed::Feed {
    parse(fixture(name), &ParseOptions::default()).unwrap()
}

fn with_item_tag(tag: &str) -> Schema {
    let mut schema = Schema::default();
    schema.push_item_tag(tag);
    schema
}

// ============================================================================
// RSS 2.0
// ============================================================================

#[test]
fn test_rss20_feed_fields() {
    let feed = parse_fixture("rss20.xml");
    assert_eq!(feed.title(), Some("Technoblog"));
    assert_eq!(feed.link(), Some("http://tech.rufy.com"));
    assert_eq!(
        feed.description(),
        Some("Ruby, Rails, and the occasional rant")
    );
    assert_eq!(feed.text("language"), Some("en-us"));
    assert_eq!(feed.text("generator"), Some("Typo"));
    assert!(feed
        .text("feedburner_browserFriendly")
        .is_some_and(|s| s.starts_with("This is an XML content feed.")));
    assert!(feed.timestamp("lastBuildDate").is_some());
}

#[test]
fn test_rss20_items() {
    let feed = parse_fixture("rss20.xml");
    assert_eq!(feed.len(), 10);
    assert_eq!(feed.items().len(), 10);

    let first = feed.entry(0).unwrap();
    assert_eq!(
        first.link(),
        Some("http://feeds.feedburner.com/rufytech?m=68")
    );
    assert_eq!(
        first.timestamp("pubDate"),
        Some(&DateTime::parse_from_rfc3339("2005-08-24T13:33:34Z").unwrap())
    );
    assert_eq!(first.title(), Some("some_string.starts_with? \"foo\""));
    assert_eq!(first.text("guid"), Some("http://tech.rufy.com/entry/68"));
    assert_eq!(first.text("author"), Some("lucas@rufy.com (Lucas Carlson)"));
    assert_eq!(
        first.description(),
        Some("<p>Entry number 68. A short note about Ruby &amp; the web.</p>")
    );
    assert_eq!(
        first.text("feedburner_origLink"),
        Some("http://tech.rufy.com/entry/68")
    );

    let guids: Vec<_> = feed.iter().filter_map(|e| e.text("guid")).collect();
    assert_eq!(guids.len(), 10);
    assert_eq!(guids[9], "http://tech.rufy.com/entry/59");
    assert!(feed.entry(10).is_none());
}

#[test]
fn test_rss20_category_scalar_takes_first() {
    let feed = parse_fixture("rss20.xml");
    assert_eq!(feed.entry(0).unwrap().text("category"), Some("Programming"));
    assert_eq!(feed.entry(2).unwrap().text("category"), Some("General"));
    assert!(!feed.entry(1).unwrap().contains_key("category"));
}

#[test]
fn test_rss20_category_array() {
    let options = ParseOptions::default().with_array_tag("category");
    let feed = parse(fixture("rss20.xml"), &options).unwrap();
    assert_eq!(
        feed.entry(0).unwrap().get("category"),
        Some(&Value::TextArray(vec![
            "Programming".to_string(),
            "Ruby".to_string()
        ]))
    );
    assert_eq!(
        feed.entry(2).unwrap().get("category"),
        Some(&Value::TextArray(vec!["General".to_string()]))
    );
    assert!(!feed.entry(1).unwrap().contains_key("category"));
}

#[test]
fn test_rss20_item_attribute_with_namespace() {
    let schema = with_item_tag("item#gr:crawl-timestamp-msec");
    let feed = parse_with_schema(fixture("rss20.xml"), &schema, &ParseOptions::default()).unwrap();
    assert_eq!(
        feed.entry(0).unwrap().text("item_gr_crawl-timestamp-msec"),
        Some("1291841305234")
    );
    assert!(!feed
        .entry(1)
        .unwrap()
        .contains_key("item_gr_crawl-timestamp-msec"));
}

#[test]
fn test_rss20_latest() {
    let feed = parse_fixture("rss20.xml");
    let latest = feed.latest(3);
    let links: Vec<_> = latest.iter().filter_map(|e| e.link()).collect();
    assert_eq!(
        links,
        [
            "http://feeds.feedburner.com/rufytech?m=68",
            "http://feeds.feedburner.com/rufytech?m=67",
            "http://feeds.feedburner.com/rufytech?m=66",
        ]
    );
    assert_eq!(feed.latest(100).len(), 10);
}

// ============================================================================
// RSS 0.9 (RDF)
// ============================================================================

#[test]
fn test_rss09_feed() {
    let feed = parse_fixture("rss09.rdf");
    assert_eq!(feed.title(), Some("Slashdot"));
    assert_eq!(feed.link(), Some("http://slashdot.org/"));
    assert_eq!(
        feed.description(),
        Some("News for nerds, stuff that matters")
    );
    assert_eq!(
        feed.timestamp("dc_date"),
        Some(&DateTime::parse_from_rfc3339("2005-09-09T06:52:31+00:00").unwrap())
    );
    assert_eq!(feed.len(), 10);
}

#[test]
fn test_rss09_items_decode_escaped_links() {
    let feed = parse_fixture("rss09.rdf");
    let first = feed.entry(0).unwrap();
    assert_eq!(first.title(), Some("Apple Releases iTunes 5"));
    assert_eq!(
        first.link(),
        Some("http://rss.slashdot.org/Slashdot/slashdot?m=50&sid=05/09/09/1700200&from=rss")
    );
    assert_eq!(first.text("dc_creator"), Some("timothy"));
    assert!(first.timestamp("dc_date").is_some());
    assert!(feed
        .iter()
        .all(|e| e.link().is_some_and(|l| l.contains("&sid=") && !l.contains("&amp;"))));
}

// ============================================================================
// Atom
// ============================================================================

#[test]
fn test_atom_feed() {
    let feed = parse_fixture("atom.xml");
    assert_eq!(feed.title(), Some("dive into mark"));
    assert_eq!(feed.link(), Some("http://example.org/"));
    assert_eq!(feed.text("id"), Some("tag:example.org,2003:3"));
    assert_eq!(
        feed.text("subtitle"),
        Some("A <em>lot</em> of effort went into making this effortless")
    );
    assert_eq!(
        feed.text("rights"),
        Some("Copyright (c) 2003, Mark Pilgrim")
    );
    assert!(feed.timestamp("updated").is_some());
    assert_eq!(feed.len(), 1);
}

#[test]
fn test_atom_entry() {
    let feed = parse_fixture("atom.xml");
    let entry = feed.entry(0).unwrap();
    assert_eq!(entry.title(), Some("Atom draft-07 snapshot"));
    assert_eq!(entry.link(), Some("http://example.org/2005/04/02/atom"));
    assert_eq!(
        entry.text("link+alternate"),
        Some("http://example.org/2005/04/02/atom")
    );
    assert!(!entry.contains_key("link+self"));
    assert_eq!(entry.text("id"), Some("tag:example.org,2003:3.2397"));
    assert_eq!(entry.text("contributor"), Some("Sam Ruby"));
    assert!(entry
        .text("author")
        .is_some_and(|a| a.starts_with("Mark Pilgrim")));

    let published = entry.timestamp("published").unwrap();
    assert_eq!(published.offset().local_minus_utc(), -4 * 3600);
    assert_eq!(published.to_rfc3339(), "2003-12-13T08:29:29-04:00");
}

// ============================================================================
// Media RSS
// ============================================================================

#[test]
fn test_media_rss_attributes() {
    let feed = parse_fixture("media_rss.xml");
    assert_eq!(feed.len(), 2);

    let first = feed.entry(0).unwrap();
    assert_eq!(first.text("media_content_url"), Some("http://www.foo.com/movie.mov"));
    assert_eq!(first.text("media_content_type"), Some("video/quicktime"));
    assert_eq!(first.text("media_content_height"), Some("200"));
    assert_eq!(first.text("media_content_width"), Some("300"));
    assert_eq!(first.text("media_content_duration"), Some("185"));
    assert_eq!(first.text("media_title"), Some("The Making of a Cool Song"));
    assert_eq!(first.text("media_thumbnail_url"), Some("http://www.foo.com/keyframe.jpg"));
    assert_eq!(first.text("media_thumbnail_height"), Some("50"));
    assert_eq!(first.text("media_thumbnail_width"), Some("75"));
    assert_eq!(first.text("media_credit"), Some("John Smith"));
    assert_eq!(first.text("media_credit_role"), Some("producer"));
    assert_eq!(first.text("media_category"), Some("music/artist/album/song"));
    assert_eq!(
        first.text("media_category_scheme"),
        Some("http://search.yahoo.com/mrss/category_schema")
    );

    let second = feed.entry(1).unwrap();
    assert_eq!(second.text("media_content_url"), Some("http://www.foo.com/song.mp3"));
    assert!(!second.contains_key("media_content_height"));
    assert!(!second.contains_key("media_thumbnail_url"));
}

// ============================================================================
// Container and entry attributes
// ============================================================================

#[test]
fn test_channel_attribute() {
    let mut schema = Schema::default();
    schema.push_feed_tag("channel#custom:version");
    let feed = parse_with_schema(
        fixture("rss20_with_channel_attrs.xml"),
        &schema,
        &ParseOptions::default(),
    )
    .unwrap();
    assert_eq!(feed.text("channel_custom_version"), Some("2.0"));
    assert_eq!(feed.title(), Some("Channel With Attributes"));
}

#[test]
fn test_feed_attribute() {
    let mut schema = Schema::default();
    schema.push_feed_tag("feed#app:id");
    let feed = parse_with_schema(
        fixture("atom_with_feed_attrs.xml"),
        &schema,
        &ParseOptions::default(),
    )
    .unwrap();
    assert_eq!(feed.text("feed_app_id"), Some("12345"));
}

#[test]
fn test_entry_attribute() {
    let schema = with_item_tag("entry#custom:id");
    let feed = parse_with_schema(
        fixture("atom_with_entry_attrs.xml"),
        &schema,
        &ParseOptions::default(),
    )
    .unwrap();
    assert_eq!(feed.entry(0).unwrap().text("entry_custom_id"), Some("12345"));
    assert!(!feed.entry(1).unwrap().contains_key("entry_custom_id"));
}

#[test]
fn test_item_attribute() {
    let schema = with_item_tag("item#data-id");
    let feed = parse_with_schema(
        fixture("rss20_with_item_attrs.xml"),
        &schema,
        &ParseOptions::default(),
    )
    .unwrap();
    assert_eq!(feed.entry(0).unwrap().text("item_data-id"), Some("67890"));
    assert!(!feed.entry(1).unwrap().contains_key("item_data-id"));
}

// ============================================================================
// Malformed and non-feed input
// ============================================================================

#[test]
fn test_not_a_feed() {
    let err = parse(fixture("not-rss.xml"), &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, FeedError::Format));
}

#[test]
fn test_malformed_feed_still_parses() {
    let feed = parse_fixture("malformed.xml");
    assert_eq!(feed.title(), Some("Broken & Proud"));
    assert_eq!(feed.link(), Some("http://example.com/?a=1&b=2"));
    assert_eq!(feed.len(), 2);

    let first = feed.entry(0).unwrap();
    assert_eq!(
        first.title(),
        Some("Unescaped <b>markup</b> & ampersands")
    );
    assert_eq!(first.text("author"), Some("Jane"));
    assert_eq!(
        first.timestamp("pubDate").map(|ts| ts.to_rfc3339()),
        Some("2005-09-09T02:52:31-07:00".to_string())
    );
    assert_eq!(first.description(), Some("Unclosed <p>paragraph"));

    let second = feed.entry(1).unwrap();
    assert_eq!(second.get("pubDate"), Some(&Value::Text("not a date".into())));
    assert!(!second.contains_key("guid"));
}

#[test]
fn test_key_set_is_stable_across_parses() {
    let a = parse_fixture("rss20.xml");
    let b = parse_fixture("rss20.xml");
    assert_eq!(a, b);
    let keys: Vec<_> = a.keys().collect();
    assert_eq!(keys[0], "title");
}
