use anyhow::Result;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};
use std::io::Stdout;
use textwrap::wrap;
use wpn_common::Corpus;

use crate::styles;

pub struct ViewSnap {
    pub filter: String,
    pub filter_cursor: usize,
    pub filter_focused: bool,
    pub cards: Vec<(String, Style)>,
    pub scroll: usize,
    pub busy: bool,
    pub spinner: &'static str,
    pub status: String,
}

/// Flatten the corpus into styled card lines, honouring the filter.
///
/// A channel is shown when the filter is empty, or when it matches the
/// channel name or any song title/artist (case-insensitive substring), the
/// same visibility rule the dashboard has always had.
pub fn build_cards(corpus: &Corpus, filter: &str) -> Vec<(String, Style)> {
    let needle = filter.trim().to_lowercase();
    let mut lines = Vec::new();

    for snapshot in &corpus.channels {
        let visible = needle.is_empty()
            || snapshot.channel.name.to_lowercase().contains(&needle)
            || snapshot.all_songs().iter().any(|s| {
                s.title.to_lowercase().contains(&needle)
                    || s.artist.to_lowercase().contains(&needle)
            });
        if !visible {
            continue;
        }

        let color = styles::card_color(snapshot.channel.index);
        lines.push((snapshot.channel.name.clone(), styles::channel_name(color)));
        lines.push((
            format!(
                "Now Playing: {} by {}",
                snapshot.current.title, snapshot.current.artist
            ),
            styles::song_text(color),
        ));
        if !snapshot.previous.is_empty() {
            lines.push(("Previous Songs:".to_string(), styles::label()));
            for song in &snapshot.previous {
                lines.push((
                    format!("• {} by {}", song.title, song.artist),
                    styles::song_text(color),
                ));
            }
        }
        lines.push((String::new(), styles::dim()));
    }

    for failure in &corpus.failures {
        lines.push((
            format!("{}: unavailable ({})", failure.channel.name, failure.error),
            styles::error(),
        ));
    }

    lines
}

pub fn draw(term: &mut Terminal<CrosstermBackend<Stdout>>, snap: &ViewSnap) -> Result<()> {
    term.draw(|frame| {
        let area = frame.area();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let header = Paragraph::new(Line::from(vec![
            Span::styled(" What's Playing Now ", styles::label()),
            Span::styled(
                "— q quit • r refresh • f filter",
                styles::dim(),
            ),
        ]));
        frame.render_widget(header, layout[0]);

        // Filter input
        let filter_title = if snap.filter_focused {
            " Filter (Esc to leave) "
        } else {
            " Filter "
        };
        let filter_box = Paragraph::new(snap.filter.clone())
            .block(Block::default().borders(Borders::ALL).title(filter_title));
        frame.render_widget(Clear, layout[1]);
        frame.render_widget(filter_box, layout[1]);
        if snap.filter_focused {
            let caret_x = layout[1].x + 1 + visual_caret_col(&snap.filter, snap.filter_cursor);
            let caret_y = layout[1].y + 1;
            frame.set_cursor_position(Position {
                x: caret_x,
                y: caret_y,
            });
        }

        // Channel cards
        let visible_h = layout[2].height.saturating_sub(2) as usize;
        let content_width = layout[2].width.saturating_sub(2) as usize;
        let wrapped = wrap_cards(&snap.cards, content_width);
        let total = wrapped.len();
        let start = snap.scroll.min(total.saturating_sub(1));
        let end = (start + visible_h).min(total);

        let items: Vec<ListItem> = wrapped[start..end]
            .iter()
            .map(|(text, style)| ListItem::new(Line::from(Span::styled(text.clone(), *style))))
            .collect();
        let body =
            List::new(items).block(Block::default().borders(Borders::ALL).title(" Channels "));
        frame.render_widget(body, layout[2]);

        // Status bar
        let status_line = Line::from(vec![
            Span::raw(" "),
            Span::styled(snap.spinner, styles::label()),
            Span::raw(" "),
            if snap.busy {
                Span::styled("Refreshing…", styles::label())
            } else {
                Span::styled("Idle", styles::dim())
            },
            Span::raw(format!(" • {}", snap.status)),
        ]);
        let status = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::ALL).title(" Status "));
        frame.render_widget(status, layout[3]);
    })?;

    Ok(())
}

fn visual_caret_col(input: &str, cursor: usize) -> u16 {
    use unicode_width::UnicodeWidthStr;
    UnicodeWidthStr::width(&input[..cursor]) as u16
}

fn wrap_cards(lines: &[(String, Style)], width: usize) -> Vec<(String, Style)> {
    let effective_width = width.max(1);
    let mut out = Vec::new();

    for (text, style) in lines {
        if text.is_empty() {
            out.push((String::new(), *style));
            continue;
        }
        let segments = wrap(text, effective_width);
        if segments.is_empty() {
            out.push((String::new(), *style));
        } else {
            out.extend(segments.into_iter().map(|seg| (seg.into_owned(), *style)));
        }
    }

    out
}
