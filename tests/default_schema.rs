//! Integration test: the process-wide default schema.
//!
//! This binary is the only one that mutates the default, and does so from a
//! single test so no other parse in the process observes the change.

use feedscan::feed::schema::{self, DEFAULT_FEED_TAGS, DEFAULT_ITEM_TAGS};
use feedscan::feed::{
    default_schema, parse, set_default_schema, update_default_schema, ParseOptions, Schema,
};
use pretty_assertions::assert_eq;

const ATOM_WITH_ENTRY_ATTRS: &str = include_str!("fixtures/atom_with_entry_attrs.xml");

#[test]
fn test_default_schema_mutation() {
    assert_eq!(default_schema(), Schema::default());
    assert_eq!(schema::feed_tags(), DEFAULT_FEED_TAGS);
    assert_eq!(schema::item_tags().len(), DEFAULT_ITEM_TAGS.len());

    let options = ParseOptions::default();
    let before = parse(ATOM_WITH_ENTRY_ATTRS, &options).unwrap();
    assert!(!before.entry(0).unwrap().contains_key("entry_custom_id"));

    // Extending the default is visible to later parses only
    update_default_schema(|s| s.push_item_tag("entry#custom:id"));
    assert_eq!(
        schema::item_tags().last().map(String::as_str),
        Some("entry#custom:id")
    );
    let after = parse(ATOM_WITH_ENTRY_ATTRS, &options).unwrap();
    assert_eq!(after.entry(0).unwrap().text("entry_custom_id"), Some("12345"));
    assert!(!before.entry(0).unwrap().contains_key("entry_custom_id"));

    // Replacing a list changes which keys exist and their order
    schema::set_item_tags(["link", "title"]);
    schema::set_feed_tags(["title"]);
    let narrowed = parse(ATOM_WITH_ENTRY_ATTRS, &options).unwrap();
    assert_eq!(narrowed.keys().collect::<Vec<_>>(), ["title"]);
    assert_eq!(
        narrowed.entry(0).unwrap().keys().collect::<Vec<_>>(),
        ["link", "title"]
    );
    assert_eq!(narrowed.entry(0).unwrap().link(), Some("http://example.com/1"));

    set_default_schema(Schema::default());
    assert_eq!(default_schema(), Schema::default());
    let restored = parse(ATOM_WITH_ENTRY_ATTRS, &options).unwrap();
    assert_eq!(restored, before);
}
