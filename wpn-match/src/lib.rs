//! Fuzzy identification of a song across the aggregated corpus.
//!
//! Given free text like `"wonderwall by oasis"`, [`FuzzyIdentifier::identify`]
//! scores every `(channel, song)` pair in a [`Corpus`] and returns the best
//! match with a confidence in `[0, 100]`. The concrete similarity metric
//! sits behind the [`Similarity`] trait so it can be swapped without
//! touching the orchestration.
//!
//! "Is this good enough" is the caller's decision: as long as the corpus is
//! non-empty, the best available match is always returned, however low its
//! confidence.

use thiserror::Error;
use wpn_common::{Channel, Corpus, Song};

/// Separator recognised inside queries, mirroring the site's entry format.
pub const DEFAULT_QUERY_DELIMITER: &str = " by ";

#[derive(Debug, Error)]
pub enum MatchError {
    /// Empty or whitespace-only query; rejected before any scoring.
    #[error("query is empty")]
    InvalidQuery,
    /// The corpus holds no channels, so there is nothing to score against.
    #[error("corpus contains no channels")]
    EmptyCorpus,
}

/// Best-scoring `(channel, song)` pair for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub channel: Channel,
    pub song: Song,
    /// Bounded to `[0, 100]`; 100 is an exact match under the active metric.
    pub confidence: f64,
}

/// Approximate string similarity, bounded to `[0, 100]`.
pub trait Similarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Jaro-Winkler similarity. Identical strings score exactly 100.
#[derive(Debug, Default, Clone, Copy)]
pub struct JaroWinkler;

impl Similarity for JaroWinkler {
    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(a, b) * 100.0
    }
}

/// Levenshtein distance normalised by the longer input's length.
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b) * 100.0
    }
}

pub struct FuzzyIdentifier {
    similarity: Box<dyn Similarity>,
    delimiter: String,
}

impl Default for FuzzyIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyIdentifier {
    pub fn new() -> Self {
        Self {
            similarity: Box::new(JaroWinkler),
            delimiter: DEFAULT_QUERY_DELIMITER.to_string(),
        }
    }

    /// Swap the similarity metric.
    pub fn with_similarity(mut self, similarity: Box<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Override the `"song by artist"` delimiter recognised in queries.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Score `query` against every song in the corpus and return the best
    /// match.
    ///
    /// Exact score ties keep the first pair in corpus iteration order, so
    /// repeated runs over the same corpus are deterministic.
    pub fn identify(&self, query: &str, corpus: &Corpus) -> Result<MatchResult, MatchError> {
        let normalized = self.normalize_query(query)?;
        if corpus.is_empty() {
            return Err(MatchError::EmptyCorpus);
        }

        let mut best: Option<MatchResult> = None;
        for (channel, song) in corpus.song_pairs() {
            let candidate = song.combined().to_lowercase();
            let confidence = self.similarity.score(&normalized, &candidate).clamp(0.0, 100.0);
            // Strict comparison keeps the earlier pair on exact ties.
            if best.as_ref().is_none_or(|b| confidence > b.confidence) {
                best = Some(MatchResult {
                    channel: channel.clone(),
                    song: song.clone(),
                    confidence,
                });
            }
        }

        let result = best.ok_or(MatchError::EmptyCorpus)?;
        tracing::debug!(
            target: "matching",
            query = %normalized,
            channel = %result.channel.name,
            title = %result.song.title,
            confidence = result.confidence,
            "match.identified"
        );
        Ok(result)
    }

    /// Case-fold and trim; a `"title by artist"` query collapses to the
    /// same `"title artist"` form songs are scored under.
    fn normalize_query(&self, query: &str) -> Result<String, MatchError> {
        let folded = query.trim().to_lowercase();
        if folded.is_empty() {
            return Err(MatchError::InvalidQuery);
        }
        let delimiter = self.delimiter.to_lowercase();
        Ok(match folded.split_once(&delimiter) {
            Some((title, artist)) => format!("{} {}", title.trim(), artist.trim()),
            None => folded,
        })
    }
}
