//! Feed retrieval and decoding.
//!
//! - [`fetcher`] - one bounded HTTP GET per poll, classifying 429 apart from
//!   other failures
//! - [`parser`] - root-element format detection and dispatch
//! - [`atom`] / [`rss`] - dialect decoders producing posts in document order
//! - [`identity`] - the per-feed post key
//!
//! # Example
//!
//! ```ignore
//! use feedpoll::feed::{parse_feed, Fetcher, DEFAULT_FETCH_TIMEOUT};
//!
//! let fetcher = Fetcher::new(DEFAULT_FETCH_TIMEOUT)?;
//! let bytes = fetcher.fetch(&feed.url).await?;
//! let posts = parse_feed(&bytes, &feed)?;
//! ```

pub mod atom;
mod fetcher;
mod identity;
mod parser;
pub mod rss;

pub use fetcher::{FetchError, Fetcher, DEFAULT_FETCH_TIMEOUT};
pub use identity::PostUid;
pub use parser::{detect_format, parse_feed, FeedFormat, ParseError};
