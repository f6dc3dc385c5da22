//! Tolerant RSS/Atom extraction.
//!
//! This module turns loosely structured feed markup into a normalized, tag-keyed model
//! and back:
//!
//! - **Descriptors & schema**: which tags to look for, and under which output keys
//! - **Extraction**: finding elements and attributes without an XML parser
//! - **Normalization**: dates, markup stripping, percent-decoding, NFC
//! - **Parsing**: assembling the feed map and the ordered entry list
//! - **Serialization**: RSS 2.0, Atom, and a JSON-ready mapping
//! - **Fetching**: conditional GET with manual redirect handling
//!
//! # Example
//!
//! ```
//! use feedscan::feed::{parse, ParseOptions};
//!
//! let xml = "<rss><channel><title>Demo</title>\
//!            <item><title>First</title></item></channel></rss>";
//! let feed = parse(xml, &ParseOptions::default())?;
//! assert_eq!(feed.title(), Some("Demo"));
//! assert_eq!(feed.entries()[0].title(), Some("First"));
//! # Ok::<(), feedscan::feed::FeedError>(())
//! ```

pub mod descriptor;
pub mod extract;
mod fetcher;
mod model;
pub mod normalize;
mod parser;
pub mod schema;
mod serialize;

use thiserror::Error;

pub use descriptor::{DescriptorKind, TagDescriptor};
pub use fetcher::{build_client, fetch, FetchError, FetchOptions, FetchOutcome, DEFAULT_USER_AGENT};
pub use model::{Entry, Feed, Fields, Value};
pub use parser::{parse, parse_reader, parse_with_schema, ParseOptions};
pub use schema::{default_schema, set_default_schema, update_default_schema, Schema};
pub use serialize::{to_atom, to_json, to_mapping, to_rss2, to_xml, OutputFormat};

/// Errors raised by parsing and serialization.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The document has no `<channel>` or `<feed>` container.
    #[error("Poorly formatted feed: no <channel> or <feed> container found")]
    Format,

    /// An output format other than the supported ones was requested.
    #[error("Unknown format: {requested}. Supported: rss2, atom")]
    InvalidArgument { requested: String },

    /// Reading the source failed.
    #[error("Failed to read feed source: {0}")]
    Io(#[from] std::io::Error),
}
