//! Utility functions shared by the API and startup.
//!
//! - **URL validation**: rejects feed URLs that would make the poller reach
//!   into the local network (SSRF)
//!
//! # Examples
//!
//! ```
//! use feedpoll::util::validate_url;
//!
//! let url = validate_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//! ```

mod url_validator;

pub use url_validator::{validate_url, UrlValidationError};
