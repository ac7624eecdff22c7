//! Content length and Content-Range helpers.
//!
//! Servers describe partial responses with `Content-Range`:
//!
//! - `bytes 1024-4095/4096` on a 206
//! - `bytes */4096` on a 416
//!
//! The total may be `*` when unknown.

use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_RANGE};

/// A parsed `Content-Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// First and last byte positions, `None` for `bytes */N`.
    pub range: Option<(u64, u64)>,
    /// Complete length of the resource, `None` when `*`.
    pub total: Option<u64>,
}

impl ContentRange {
    /// First byte position served, if any.
    pub fn start(&self) -> Option<u64> {
        self.range.map(|(start, _)| start)
    }
}

/// Parse a `Content-Range` header value.
///
/// # Example
///
/// ```rust
/// use rpip::utils::parse_content_range;
///
/// let range = parse_content_range("bytes 1024-4095/4096").unwrap();
/// assert_eq!(range.range, Some((1024, 4095)));
/// assert_eq!(range.total, Some(4096));
/// ```
pub fn parse_content_range(content_range: &str) -> Option<ContentRange> {
    let spec = content_range.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = spec.split_once('/')?;

    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse::<u64>().ok()?),
    };

    let range = match range.trim() {
        "*" => None,
        r => {
            let (start, end) = r.split_once('-')?;
            let start = start.trim().parse::<u64>().ok()?;
            let end = end.trim().parse::<u64>().ok()?;
            if end < start {
                return None;
            }
            Some((start, end))
        }
    };

    Some(ContentRange { range, total })
}

/// Parse Content-Range header to extract total size.
///
/// # Example
///
/// ```rust
/// use rpip::utils::parse_content_range_total;
///
/// let total = parse_content_range_total("bytes 0-1023/2048");
/// assert_eq!(total, Some(2048));
/// ```
pub fn parse_content_range_total(content_range: &str) -> Option<u64> {
    parse_content_range(content_range).and_then(|r| r.total)
}

/// The `Content-Range` of a response, if present and well formed.
pub fn content_range(headers: &HeaderMap) -> Option<ContentRange> {
    headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_content_range)
}

/// The `Content-Length` of a response, if present and well formed.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}
