//! rowsync Feed - Entry reader for tabular remote feeds
//!
//! A feed arrives as a stream of tag events (entry start, named cells, the
//! row's `updated` clock, entry end, document end). This crate assembles
//! those events into one [`rowsync_core::Entry`] per row:
//! - Tag events and tag sources
//! - Entry readers, including an in-memory reader for callers that already hold rows
//! - A JSON-lines tag source
//! - `updated` clock parsing

pub mod clock;
pub mod tags;
pub mod reader;
pub mod jsonl;

pub use clock::*;
pub use tags::*;
pub use reader::*;
pub use jsonl::*;
