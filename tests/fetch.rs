//! Integration tests: fetching fixtures over HTTP with conditional GET.

use feedscan::feed::{build_client, fetch, FetchOptions, FetchOutcome, ParseOptions};
use std::path::Path;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)).unwrap()
}

#[tokio::test]
async fn test_conditional_refetch_cycle() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss"))
        .and(header("If-None-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(fixture("rss20.xml"))
                .insert_header("Content-Type", "application/rss+xml")
                .insert_header("ETag", "\"v1\"")
                .insert_header("Last-Modified", "Wed, 24 Aug 2005 13:33:34 GMT"),
        )
        .mount(&server)
        .await;

    let client = build_client(None).unwrap();
    let url = format!("{}/rss", server.uri());

    // First fetch: full body
    let first = fetch(&client, &url, &FetchOptions::default()).await.unwrap();
    let FetchOutcome::Fetched(feed) = first else {
        panic!("expected a feed");
    };
    assert_eq!(feed.title(), Some("Technoblog"));
    assert_eq!(feed.len(), 10);
    assert_eq!(feed.etag(), Some("\"v1\""));
    assert_eq!(feed.last_modified(), Some("Wed, 24 Aug 2005 13:33:34 GMT"));

    // Second fetch: send the tokens back
    let options = FetchOptions {
        etag: feed.etag().map(str::to_string),
        last_modified: feed.last_modified().map(str::to_string),
        ..FetchOptions::default()
    };
    let second = fetch(&client, &url, &options).await.unwrap();
    assert!(matches!(second, FetchOutcome::NotModified));
}

#[tokio::test]
async fn test_fetch_applies_parse_options() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(fixture("rss20.xml")))
        .mount(&server)
        .await;

    let client = build_client(Some("feedscan-test/0.1")).unwrap();
    let options = FetchOptions {
        parse: ParseOptions::default().with_array_tag("category"),
        ..FetchOptions::default()
    };
    let outcome = fetch(&client, &format!("{}/rss", server.uri()), &options)
        .await
        .unwrap();

    let FetchOutcome::Fetched(feed) = outcome else {
        panic!("expected a feed");
    };
    let categories = feed.entry(0).and_then(|e| e.get("category")).unwrap();
    assert_eq!(categories.as_array().map(<[String]>::len), Some(2));
    assert!(feed.etag().is_none());
}
