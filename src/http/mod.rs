//! HTTP module containing HTTP client functionality.
//!
//! # Overview
//!
//! - [`client`] - HTTP client creation and middleware configuration
//! - [`probe`] - The [`RangeProbe`], asking a server about partial content
//!
//! # Examples
//!
//! ```rust,no_run
//! use rpip::http::{create_http_client, HttpClientConfig, RangeProbe};
//! use reqwest::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! let url = Url::parse("https://example.test/pkg-1.0.whl")?;
//! let support = RangeProbe::new(client).probe(&url).await;
//! println!("resumable: {}, size: {:?}", support.may_resume(), support.total_size);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod probe;

pub use client::{create_http_client, HttpClientConfig, DEFAULT_USER_AGENT};
pub use probe::{RangeProbe, RangeSupport, DEFAULT_PROBE_TIMEOUT};
