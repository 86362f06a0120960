//! Retrieval and parsing of "now playing" data from the upstream site.
//!
//! Three layers, leaf-first:
//!
//! - [`markup`]: pure HTML extraction for the two page shapes the site
//!   serves (the channel directory and a per-channel song page)
//! - [`catalog`]: the process-lifetime channel directory, fetched once and
//!   memoised behind a single-flight guard
//! - [`aggregate`]: per-channel song queries and the full-corpus fan-out
//!
//! Everything network-facing goes through the [`wpn_http::PageSource`]
//! seam, so the whole crate is testable offline with canned markup.

use thiserror::Error;
use wpn_http::FetchError;

pub mod aggregate;
pub mod catalog;
pub mod markup;

pub use aggregate::SongAggregator;
pub use catalog::{ChannelCatalog, ChannelRef};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// The expected page structure is absent. This signals upstream layout
    /// drift, not a transient failure.
    #[error("expected markup structure missing: {0}")]
    Structure(&'static str),
    #[error("no channel matching \"{0}\"")]
    NotFound(String),
}
