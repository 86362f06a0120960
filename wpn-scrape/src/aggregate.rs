//! Per-channel song queries and the full-corpus fan-out.
//!
//! Single-channel operations perform one fetch+parse each. The corpus
//! builder resolves the whole directory, fans out over every channel page
//! concurrently, and isolates per-channel failures so one bad channel never
//! aborts the batch: failed channels are omitted from the corpus and
//! recorded on its failure list.

use std::sync::Arc;

use wpn_common::{Channel, ChannelFailure, ChannelSongs, Corpus, Song};
use wpn_http::PageSource;

use crate::{markup, ChannelCatalog, ScrapeError};

pub struct SongAggregator {
    source: Arc<dyn PageSource>,
    catalog: Arc<ChannelCatalog>,
    /// Per-channel page path template; `{id}` is replaced with the channel
    /// identifier.
    channel_path: String,
    delimiter: String,
}

impl SongAggregator {
    pub fn new(
        source: Arc<dyn PageSource>,
        catalog: Arc<ChannelCatalog>,
        channel_path: impl Into<String>,
        delimiter: impl Into<String>,
    ) -> Self {
        Self {
            source,
            catalog,
            channel_path: channel_path.into(),
            delimiter: delimiter.into(),
        }
    }

    pub fn catalog(&self) -> &ChannelCatalog {
        &self.catalog
    }

    fn page_path(&self, channel: &Channel) -> String {
        self.channel_path.replace("{id}", &channel.identifier)
    }

    async fn fetch_page(&self, channel: &Channel) -> Result<(Song, Vec<Song>), ScrapeError> {
        let markup = self.source.get(&self.page_path(channel)).await?;
        markup::parse_channel_page(&markup, &self.delimiter)
    }

    /// The song playing right now on `channel`.
    pub async fn current_song(&self, channel: &Channel) -> Result<Song, ScrapeError> {
        let (current, _) = self.fetch_page(channel).await?;
        Ok(current)
    }

    /// The channel's history list, page order preserved (most-recent-first
    /// as served).
    pub async fn previous_songs(&self, channel: &Channel) -> Result<Vec<Song>, ScrapeError> {
        let (_, previous) = self.fetch_page(channel).await?;
        Ok(previous)
    }

    /// Full listing: the live song first, then the history.
    pub async fn all_songs(&self, channel: &Channel) -> Result<Vec<Song>, ScrapeError> {
        Ok(self.channel_songs(channel).await?.all_songs())
    }

    /// One channel's snapshot, built fresh from a single fetch.
    pub async fn channel_songs(&self, channel: &Channel) -> Result<ChannelSongs, ScrapeError> {
        let (current, previous) = self.fetch_page(channel).await?;
        Ok(ChannelSongs {
            channel: channel.clone(),
            current,
            previous,
        })
    }

    /// Fetch every channel's page concurrently and assemble the corpus in
    /// directory order. Channels whose fetch or parse failed are recorded on
    /// `failures` and left out of `channels`; only a directory failure
    /// aborts the call.
    pub async fn all_channels_data(&self) -> Result<Corpus, ScrapeError> {
        let channels = self.catalog.list().await?.to_vec();
        let paths: Vec<String> = channels.iter().map(|c| self.page_path(c)).collect();
        let results = self.source.get_many(&paths).await;

        let mut corpus = Corpus::default();
        for (channel, result) in channels.into_iter().zip(results) {
            let parsed = result
                .map_err(ScrapeError::from)
                .and_then(|markup| markup::parse_channel_page(&markup, &self.delimiter));
            match parsed {
                Ok((current, previous)) => corpus.channels.push(ChannelSongs {
                    channel,
                    current,
                    previous,
                }),
                Err(err) => {
                    tracing::warn!(
                        target: "scrape",
                        channel = %channel.name,
                        error = %err,
                        "scrape.channel.failed"
                    );
                    corpus.failures.push(ChannelFailure {
                        channel,
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            target: "scrape",
            ok = corpus.channels.len(),
            failed = corpus.failures.len(),
            "scrape.corpus.assembled"
        );
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use wpn_http::FetchError;

    const DIRECTORY: &str = r#"
        <select id="channel-select">
          <option value="hits90s">90s Hits</option>
          <option value="indie">Indie Underground</option>
          <option value="classical">Classical Focus</option>
        </select>
    "#;

    fn channel_page(current: &str, previous: &[&str]) -> String {
        let items: String = previous
            .iter()
            .map(|entry| format!("<li>{entry}</li>"))
            .collect();
        format!(
            r#"<div class="now-playing">{current}</div><ul class="recently-played">{items}</ul>"#
        )
    }

    struct StubSource {
        pages: HashMap<String, Result<String, FetchError>>,
    }

    #[async_trait]
    impl PageSource for StubSource {
        async fn get(&self, path: &str) -> Result<String, FetchError> {
            self.pages
                .get(path)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Network(format!("no stub for {path}"))))
        }

        async fn get_many(&self, paths: &[String]) -> Vec<Result<String, FetchError>> {
            futures::future::join_all(paths.iter().map(|p| self.get(p))).await
        }
    }

    fn aggregator_over(pages: HashMap<String, Result<String, FetchError>>) -> SongAggregator {
        let source = Arc::new(StubSource { pages });
        let catalog = Arc::new(ChannelCatalog::new(source.clone(), "/channels"));
        SongAggregator::new(source, catalog, "/channels/{id}", " by ")
    }

    fn three_channel_pages() -> HashMap<String, Result<String, FetchError>> {
        let mut pages = HashMap::new();
        pages.insert("/channels".into(), Ok(DIRECTORY.to_string()));
        pages.insert(
            "/channels/hits90s".into(),
            Ok(channel_page("Wonderwall by Oasis", &["Creep by Radiohead"])),
        );
        pages.insert(
            "/channels/indie".into(),
            Ok(channel_page("Afterglow by Mira", &[])),
        );
        pages.insert(
            "/channels/classical".into(),
            Ok(channel_page("Nocturne No. 2 by Chopin", &["Clair de Lune by Debussy"])),
        );
        pages
    }

    #[tokio::test]
    async fn all_songs_equals_current_then_previous() {
        let agg = aggregator_over(three_channel_pages());
        let channel = agg.catalog().resolve(&crate::ChannelRef::ByIndex(0)).await.unwrap();

        let current = agg.current_song(&channel).await.unwrap();
        let previous = agg.previous_songs(&channel).await.unwrap();
        let all = agg.all_songs(&channel).await.unwrap();

        let mut expected = vec![current];
        expected.extend(previous);
        assert_eq!(all, expected);
    }

    #[tokio::test]
    async fn corpus_is_assembled_in_directory_order() {
        let agg = aggregator_over(three_channel_pages());
        let corpus = agg.all_channels_data().await.unwrap();

        assert!(corpus.failures.is_empty());
        let names: Vec<&str> = corpus
            .channels
            .iter()
            .map(|cs| cs.channel.name.as_str())
            .collect();
        assert_eq!(names, ["90s Hits", "Indie Underground", "Classical Focus"]);
        assert_eq!(corpus.channels[1].current, Song::new("Afterglow", "Mira"));
    }

    #[tokio::test]
    async fn timed_out_channel_is_recorded_not_fatal() {
        let mut pages = three_channel_pages();
        pages.insert("/channels/indie".into(), Err(FetchError::Timeout));

        let agg = aggregator_over(pages);
        let corpus = agg.all_channels_data().await.unwrap();

        assert_eq!(corpus.channels.len(), 2);
        assert_eq!(corpus.failures.len(), 1);
        assert_eq!(corpus.failures[0].channel.name, "Indie Underground");
        assert!(corpus.failures[0].error.contains("timed out"));
    }

    #[tokio::test]
    async fn malformed_channel_page_is_recorded_not_fatal() {
        let mut pages = three_channel_pages();
        pages.insert(
            "/channels/classical".into(),
            Ok("<p>stream offline</p>".to_string()),
        );

        let agg = aggregator_over(pages);
        let corpus = agg.all_channels_data().await.unwrap();

        assert_eq!(corpus.channels.len(), 2);
        assert_eq!(corpus.failures.len(), 1);
        assert_eq!(corpus.failures[0].channel.name, "Classical Focus");
    }

    #[tokio::test]
    async fn directory_failure_aborts_aggregation() {
        let mut pages = three_channel_pages();
        pages.insert(
            "/channels".into(),
            Err(FetchError::Status(wpn_http::StatusCode::BAD_GATEWAY)),
        );

        let agg = aggregator_over(pages);
        assert!(agg.all_channels_data().await.is_err());
    }
}
