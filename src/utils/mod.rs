//! Shared utility functions.
//!
//! - [`content_length`] - `Content-Length` and `Content-Range` parsing

pub mod content_length;

pub use content_length::{
    content_length, content_range, parse_content_range, parse_content_range_total, ContentRange,
};
