//! Dashboard event loop.
//!
//! Input events and ticks are fed into one mpsc queue; corpus refreshes run
//! on the runtime and report back through the same queue, so drawing never
//! blocks on the network.

use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{Event as CtEvent, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wpn_common::Corpus;
use wpn_scrape::SongAggregator;

use crate::view::{self, ViewSnap};

const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TICK: Duration = Duration::from_millis(80);

enum TuiMsg {
    Input(CtEvent),
    Tick,
    RefreshDone(Result<Corpus, String>),
}

struct Dashboard {
    aggregator: Arc<SongAggregator>,
    corpus: Corpus,
    filter: String,
    filter_cursor: usize,
    filter_focused: bool,
    scroll: usize,
    busy: bool,
    spin_idx: usize,
    status: String,
    dirty: bool,
}

impl Dashboard {
    fn new(aggregator: Arc<SongAggregator>) -> Self {
        Self {
            aggregator,
            corpus: Corpus::default(),
            filter: String::new(),
            filter_cursor: 0,
            filter_focused: false,
            scroll: 0,
            busy: false,
            spin_idx: 0,
            status: "loading…".to_string(),
            dirty: true,
        }
    }

    fn snapshot(&self) -> ViewSnap {
        ViewSnap {
            filter: self.filter.clone(),
            filter_cursor: self.filter_cursor,
            filter_focused: self.filter_focused,
            cards: view::build_cards(&self.corpus, &self.filter),
            scroll: self.scroll,
            busy: self.busy,
            spinner: BRAILLE_FRAMES[self.spin_idx % BRAILLE_FRAMES.len()],
            status: self.status.clone(),
        }
    }

    fn start_refresh(&mut self, tx: mpsc::UnboundedSender<TuiMsg>) {
        if self.busy {
            return;
        }
        self.busy = true;
        self.dirty = true;
        let aggregator = self.aggregator.clone();
        tokio::spawn(async move {
            let result = aggregator
                .all_channels_data()
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(TuiMsg::RefreshDone(result));
        });
    }

    fn finish_refresh(&mut self, result: Result<Corpus, String>) {
        self.busy = false;
        self.dirty = true;
        match result {
            Ok(corpus) => {
                self.status = format!(
                    "{} channels, {} unavailable • updated {}",
                    corpus.channels.len(),
                    corpus.failures.len(),
                    Local::now().format("%H:%M:%S"),
                );
                self.corpus = corpus;
            }
            Err(err) => {
                tracing::warn!(target: "tui", error = %err, "tui.refresh.failed");
                self.status = format!("refresh failed: {err}");
            }
        }
    }

    /// Returns `false` when the dashboard should exit.
    fn handle_key(&mut self, key: KeyEvent, tx: &mpsc::UnboundedSender<TuiMsg>) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return false;
        }

        if self.filter_focused {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.filter_focused = false,
                KeyCode::Backspace => {
                    if self.filter.pop().is_some() {
                        self.filter_cursor = self.filter.len();
                        self.scroll = 0;
                    }
                }
                KeyCode::Char(ch) => {
                    self.filter.push(ch);
                    self.filter_cursor = self.filter.len();
                    self.scroll = 0;
                }
                _ => {}
            }
            self.dirty = true;
            return true;
        }

        match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('r') => self.start_refresh(tx.clone()),
            KeyCode::Char('f') => self.filter_focused = true,
            KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::Home => self.scroll = 0,
            _ => {}
        }
        self.dirty = true;
        true
    }
}

fn spawn_feeders(tx: mpsc::UnboundedSender<TuiMsg>) {
    let input_tx = tx.clone();
    tokio::spawn(async move {
        loop {
            let ev = tokio::task::spawn_blocking(crossterm::event::read).await;
            match ev {
                Ok(Ok(e)) => {
                    if input_tx.send(TuiMsg::Input(e)).is_err() {
                        break;
                    }
                }
                _ => break,
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK);
        loop {
            interval.tick().await;
            if tx.send(TuiMsg::Tick).is_err() {
                break;
            }
        }
    });
}

/// Run the dashboard until the user quits. Takes over the terminal for the
/// duration; the alternate screen is restored on the way out.
pub async fn run_dashboard(aggregator: Arc<SongAggregator>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let result = event_loop(&mut term, aggregator).await;

    disable_raw_mode()?;
    execute!(term.backend_mut(), LeaveAlternateScreen)?;
    term.show_cursor()?;
    result
}

async fn event_loop(
    term: &mut Terminal<CrosstermBackend<Stdout>>,
    aggregator: Arc<SongAggregator>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_feeders(tx.clone());

    let mut app = Dashboard::new(aggregator);
    app.start_refresh(tx.clone());
    view::draw(term, &app.snapshot())?;

    while let Some(msg) = rx.recv().await {
        match msg {
            TuiMsg::Input(CtEvent::Key(key)) => {
                if !app.handle_key(key, &tx) {
                    break;
                }
            }
            TuiMsg::Input(CtEvent::Resize(_, _)) => app.dirty = true,
            TuiMsg::Input(_) => {}
            TuiMsg::Tick => {
                if app.busy {
                    app.spin_idx = (app.spin_idx + 1) % BRAILLE_FRAMES.len();
                    app.dirty = true;
                }
            }
            TuiMsg::RefreshDone(result) => app.finish_refresh(result),
        }

        if app.dirty {
            view::draw(term, &app.snapshot())?;
            app.dirty = false;
        }
    }

    Ok(())
}
