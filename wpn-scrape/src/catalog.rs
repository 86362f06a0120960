//! Process-lifetime channel directory.
//!
//! The directory is fetched and parsed on first use, then memoised for the
//! rest of the process; picking up new channels requires a restart. The
//! first fetch is single-flight: concurrent first callers share one request
//! and a failed attempt leaves the cache empty so a later call may retry.

use std::sync::Arc;

use tokio::sync::OnceCell;
use wpn_common::Channel;
use wpn_http::PageSource;

use crate::{markup, ScrapeError};

/// Either a channel name or its directory position.
///
/// Call sites accept both forms; [`ChannelRef::parse`] decides which one an
/// input string is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    ByName(String),
    ByIndex(usize),
}

impl ChannelRef {
    /// Numeric input is an index, anything else a name.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.parse::<usize>() {
            Ok(index) => Self::ByIndex(index),
            Err(_) => Self::ByName(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByName(name) => f.write_str(name),
            Self::ByIndex(index) => write!(f, "{index}"),
        }
    }
}

pub struct ChannelCatalog {
    source: Arc<dyn PageSource>,
    directory_path: String,
    channels: OnceCell<Vec<Channel>>,
}

impl ChannelCatalog {
    pub fn new(source: Arc<dyn PageSource>, directory_path: impl Into<String>) -> Self {
        Self {
            source,
            directory_path: directory_path.into(),
            channels: OnceCell::new(),
        }
    }

    /// The channel directory, in document order. First call fetches and
    /// parses; later calls reuse the memoised list.
    pub async fn list(&self) -> Result<&[Channel], ScrapeError> {
        let channels = self
            .channels
            .get_or_try_init(|| async {
                let markup = self.source.get(&self.directory_path).await?;
                let entries = markup::parse_directory(&markup)?;
                tracing::info!(
                    target: "scrape",
                    channels = entries.len(),
                    "scrape.directory.loaded"
                );
                Ok::<_, ScrapeError>(
                    entries
                        .into_iter()
                        .enumerate()
                        .map(|(index, (name, identifier))| Channel {
                            name,
                            identifier,
                            index,
                        })
                        .collect(),
                )
            })
            .await?;
        Ok(channels)
    }

    /// Resolve a name (case-insensitive exact match) or an index in
    /// `[0, count)` to its channel.
    pub async fn resolve(&self, re: &ChannelRef) -> Result<Channel, ScrapeError> {
        let channels = self.list().await?;
        let found = match re {
            ChannelRef::ByIndex(index) => channels.get(*index).cloned(),
            ChannelRef::ByName(name) => channels
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .cloned(),
        };
        found.ok_or_else(|| ScrapeError::NotFound(re.to_string()))
    }
}
