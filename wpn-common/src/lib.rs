//! Common types shared across WPN crates.
//!
//! This crate defines the canonical song/channel model and the shared
//! observability helpers used by every binary. It is intentionally
//! lightweight and dependency‑minimal so that all crates can depend on it
//! without introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`Channel`]: one named stream from the upstream directory
//! - [`Song`]: a title/artist pair (empty string means "unknown")
//! - [`ChannelSongs`]: a channel's live song plus its recent history
//! - [`Corpus`]: the aggregated song data across every channel
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! Building a listing from a channel snapshot:
//!
//! ```rust
//! use wpn_common::{Channel, ChannelSongs, Song};
//!
//! let snapshot = ChannelSongs {
//!     channel: Channel {
//!         name: "Indie Hits".into(),
//!         identifier: "indie".into(),
//!         index: 0,
//!     },
//!     current: Song::new("Golden Days", "The Strand"),
//!     previous: vec![Song::new("Afterglow", "Mira")],
//! };
//! let all = snapshot.all_songs();
//! assert_eq!(all.len(), 2);
//! assert_eq!(all[0].title, "Golden Days");
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// A named music stream tracked by the upstream service.
///
/// `identifier` is the opaque key the site uses to address the channel's
/// page; `index` is the channel's position in the directory and is only
/// stable within one fetch of the directory. Channels are created once per
/// process when the directory is first fetched and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub identifier: String,
    pub index: usize,
}

/// A title/artist pair.
///
/// Either field may be empty when the upstream markup omits it; the empty
/// string is the canonical "unknown", never an `Option`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub artist: String,
}

impl Song {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Combined `"title artist"` form used for display and fuzzy scoring.
    /// Empty fields collapse so the result never carries stray whitespace.
    pub fn combined(&self) -> String {
        match (self.title.is_empty(), self.artist.is_empty()) {
            (false, false) => format!("{} {}", self.title, self.artist),
            (false, true) => self.title.clone(),
            (true, false) => self.artist.clone(),
            (true, true) => String::new(),
        }
    }
}

/// One channel's live song plus its recent history, most-recent-first.
///
/// Built fresh on every aggregation pass and replaced wholesale, never
/// patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSongs {
    pub channel: Channel,
    pub current: Song,
    pub previous: Vec<Song>,
}

impl ChannelSongs {
    /// Full listing with the live song at index 0, then history in page order.
    pub fn all_songs(&self) -> Vec<Song> {
        let mut out = Vec::with_capacity(1 + self.previous.len());
        out.push(self.current.clone());
        out.extend(self.previous.iter().cloned());
        out
    }
}

/// A channel whose fetch or parse failed during an aggregation pass.
///
/// Kept separate from [`Corpus::channels`] so downstream consumers never
/// mistake "no data" for "no song playing".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelFailure {
    pub channel: Channel,
    pub error: String,
}

/// Aggregated song data across every channel, in directory order.
///
/// Directory order is the documented iteration order; fuzzy matching relies
/// on it for deterministic tie-breaks. A corpus is transient: one is built
/// per aggregation call and never cached by the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub channels: Vec<ChannelSongs>,
    pub failures: Vec<ChannelFailure>,
}

impl Corpus {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Iterate `(channel, song)` pairs in corpus order, current song first
    /// within each channel.
    pub fn song_pairs(&self) -> impl Iterator<Item = (&Channel, &Song)> {
        self.channels.iter().flat_map(|cs| {
            std::iter::once((&cs.channel, &cs.current))
                .chain(cs.previous.iter().map(move |s| (&cs.channel, s)))
        })
    }
}
