//! Talks feed retrieval and parsing.
//!
//! - **Fetching**: one GET against the list's XML endpoint, no retries
//! - **Parsing**: the XML document into a series name and raw talk records
//!
//! # Example
//!
//! ```ignore
//! use talkbot::feed::{build_feed_url, fetch, parse_feed, SEARCH_WINDOW_DAYS};
//!
//! let url = build_feed_url(DEFAULT_BASE_URL, 1234, SEARCH_WINDOW_DAYS)?;
//! let bytes = fetch(&client, &url).await?;
//! let document = parse_feed(&bytes)?;
//! ```

mod fetcher;
mod parser;

pub use fetcher::{
    build_feed_url, fetch, talks_page_url, FetchError, DEFAULT_BASE_URL, SEARCH_WINDOW_DAYS,
};
pub use parser::{parse_feed, FeedDocument, ParseError, RawTalkRecord};
