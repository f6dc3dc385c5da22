//! Utility functions shared by the library and the CLI.
//!
//! - **Source decoding**: turning raw feed bytes into text without ever failing

mod encoding;

pub use encoding::decode_source;
