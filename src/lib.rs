//! A tolerant RSS/Atom tag extractor.
//!
//! `feedscan` pulls a tag-keyed model (feed metadata plus ordered entries) out of
//! feed markup that strict XML parsers reject, and can write it back out as RSS 2.0,
//! Atom, or JSON. See [`feed`] for the library surface.

pub mod config;
pub mod feed;
pub mod util;
