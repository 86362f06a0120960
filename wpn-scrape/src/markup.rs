//! HTML extraction for the site's two page shapes.
//!
//! The upstream layout is fixed and site-specific:
//!
//! - the directory page carries a `select#channel-select` element whose
//!   `option`s map channel names (text) to identifiers (`value` attribute);
//! - a channel page carries the live entry in `div.now-playing` and the
//!   history in `ul.recently-played li`, newest entries first (observed
//!   behaviour, not a documented upstream guarantee).
//!
//! Song entries are plain text in `"<title> by <artist>"` form. A missing
//! separator degrades that one entry to a title-only song; only a missing
//! structural element fails a parse.

use scraper::{ElementRef, Html, Selector};
use wpn_common::Song;

use crate::ScrapeError;

/// Separator the site puts between a song title and its artist.
pub const DEFAULT_SONG_DELIMITER: &str = " by ";

const DIRECTORY_SELECT: &str = "select#channel-select";
const DIRECTORY_OPTION: &str = "option";
const NOW_PLAYING: &str = "div.now-playing";
const PREVIOUS_ITEM: &str = "ul.recently-played li";

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Extract `(name, identifier)` pairs from the directory page, in document
/// order. Options without an identifier (placeholder entries) are skipped,
/// so every returned identifier is non-empty.
pub fn parse_directory(markup: &str) -> Result<Vec<(String, String)>, ScrapeError> {
    let doc = Html::parse_document(markup);
    let select_el = doc
        .select(&selector(DIRECTORY_SELECT))
        .next()
        .ok_or(ScrapeError::Structure("channel directory select"))?;

    let mut entries = Vec::new();
    for option in select_el.select(&selector(DIRECTORY_OPTION)) {
        let identifier = option.value().attr("value").unwrap_or("").trim();
        if identifier.is_empty() {
            continue;
        }
        entries.push((element_text(option), identifier.to_string()));
    }
    Ok(entries)
}

/// Extract the live song and the history list from a channel page.
///
/// Fails only when the now-playing element is absent. A missing or empty
/// history list degrades to `(current, [])`; history order is preserved
/// as-is from the page.
pub fn parse_channel_page(
    markup: &str,
    delimiter: &str,
) -> Result<(Song, Vec<Song>), ScrapeError> {
    let doc = Html::parse_document(markup);
    let now_el = doc
        .select(&selector(NOW_PLAYING))
        .next()
        .ok_or(ScrapeError::Structure("now-playing element"))?;

    let current = split_entry(&element_text(now_el), delimiter);
    let previous = doc
        .select(&selector(PREVIOUS_ITEM))
        .map(|li| split_entry(&element_text(li), delimiter))
        .collect();

    Ok((current, previous))
}

/// Split one `"<title> by <artist>"` entry on the first occurrence of the
/// delimiter. Without a delimiter the whole text becomes the title and the
/// artist stays empty; a malformed entry never fails the page parse.
pub fn split_entry(text: &str, delimiter: &str) -> Song {
    let text = text.trim();
    match text.split_once(delimiter) {
        Some((title, artist)) => Song::new(title.trim(), artist.trim()),
        None => Song::new(text, ""),
    }
}

/// Concatenated text content with whitespace collapsed. The DOM handles
/// entities and nested markup; we only normalise spacing.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY: &str = r#"
        <html><body>
          <form>
            <select id="channel-select">
              <option value="">Pick a channel…</option>
              <option value="hits90s">90s Hits</option>
              <option value="indie">Indie Underground</option>
              <option value="classical">Classical Focus</option>
            </select>
          </form>
        </body></html>
    "#;

    const CHANNEL_PAGE: &str = r#"
        <html><body>
          <div class="now-playing">Wonderwall by Oasis</div>
          <ul class="recently-played">
            <li>Black Hole Sun by Soundgarden</li>
            <li>Instrumental Interlude</li>
            <li>Zombie by The Cranberries</li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn directory_entries_follow_document_order() {
        let entries = parse_directory(DIRECTORY).unwrap();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["90s Hits", "Indie Underground", "Classical Focus"]);
        assert!(entries.iter().all(|(_, id)| !id.is_empty()));
    }

    #[test]
    fn directory_skips_placeholder_options() {
        let entries = parse_directory(DIRECTORY).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].1, "hits90s");
    }

    #[test]
    fn missing_directory_structure_is_a_parse_error() {
        let err = parse_directory("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, ScrapeError::Structure(_)));
    }

    #[test]
    fn channel_page_splits_current_and_previous() {
        let (current, previous) =
            parse_channel_page(CHANNEL_PAGE, DEFAULT_SONG_DELIMITER).unwrap();
        assert_eq!(current, Song::new("Wonderwall", "Oasis"));
        assert_eq!(previous.len(), 3);
        assert_eq!(previous[0], Song::new("Black Hole Sun", "Soundgarden"));
        assert_eq!(previous[2], Song::new("Zombie", "The Cranberries"));
    }

    #[test]
    fn entry_without_separator_degrades_to_title_only() {
        let (_, previous) = parse_channel_page(CHANNEL_PAGE, DEFAULT_SONG_DELIMITER).unwrap();
        assert_eq!(previous[1], Song::new("Instrumental Interlude", ""));
    }

    #[test]
    fn current_present_with_empty_history_never_fails() {
        let page = r#"<div class="now-playing">Solo by Artist</div>"#;
        let (current, previous) = parse_channel_page(page, DEFAULT_SONG_DELIMITER).unwrap();
        assert_eq!(current, Song::new("Solo", "Artist"));
        assert!(previous.is_empty());
    }

    #[test]
    fn missing_now_playing_is_a_parse_error() {
        let page = r#"<ul class="recently-played"><li>A by B</li></ul>"#;
        let err = parse_channel_page(page, DEFAULT_SONG_DELIMITER).unwrap_err();
        assert!(matches!(err, ScrapeError::Structure(_)));
    }

    #[test]
    fn split_entry_uses_first_delimiter_occurrence() {
        let song = split_entry("Stand by Me by Ben E. King", DEFAULT_SONG_DELIMITER);
        assert_eq!(song.title, "Stand");
        assert_eq!(song.artist, "Me by Ben E. King");
    }

    #[test]
    fn entity_and_nested_markup_are_decoded() {
        let page = r#"<div class="now-playing"><b>Rock &amp; Roll</b> by <i>Led Zeppelin</i></div>"#;
        let (current, _) = parse_channel_page(page, DEFAULT_SONG_DELIMITER).unwrap();
        assert_eq!(current, Song::new("Rock & Roll", "Led Zeppelin"));
    }
}
