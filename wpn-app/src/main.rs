use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use wpn_common::observability::{init_logging, LogConfig, LogFormat};
use wpn_config::{WpnConfig, WpnConfigLoader};
use wpn_http::{PageFetcher, PageSource};
use wpn_match::FuzzyIdentifier;
use wpn_scrape::{ChannelCatalog, ChannelRef, SongAggregator};

mod export;

#[derive(Parser)]
#[command(
    name = "wpn",
    version,
    about = "What's Playing Now — channel scraper and song finder"
)]
struct Cli {
    /// Path to a wpn.yaml configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the upstream site root.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override the per-request timeout, in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Override how many requests a batch keeps in flight.
    #[arg(long, global = true)]
    max_in_flight: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the channel directory.
    Channels,
    /// Show what a channel is playing right now.
    Current { channel: String },
    /// Show a channel's recently played songs.
    Previous { channel: String },
    /// Show a channel's full listing, live song first.
    Songs { channel: String },
    /// Dump every channel's data to stdout.
    All,
    /// Find which channel is playing a song.
    Identify { query: Vec<String> },
    /// Write every channel's data to a JSON file.
    Export {
        #[arg(long, default_value = "wpn.json")]
        out: PathBuf,
    },
    /// Interactive dashboard.
    Tui,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    init_logging(LogConfig {
        app_name: "wpn",
        log_dir: cfg.log.dir.as_ref().map(PathBuf::from),
        emit_stderr: cfg.log.stderr,
        format: LogFormat::Text,
        // The resolved filter lives for the whole process.
        default_filter: Box::leak(cfg.log.filter.clone().into_boxed_str()),
    })?;

    let fetcher = PageFetcher::new(&cfg.base_url)
        .with_context(|| format!("invalid base URL: {}", cfg.base_url))?
        .with_timeout(Duration::from_secs(cfg.timeout_secs))
        .with_max_in_flight(cfg.max_in_flight);
    let source: Arc<dyn PageSource> = Arc::new(fetcher);
    let catalog = Arc::new(ChannelCatalog::new(
        source.clone(),
        cfg.directory_path.clone(),
    ));
    let aggregator = Arc::new(SongAggregator::new(
        source,
        catalog.clone(),
        cfg.channel_path.clone(),
        cfg.song_delimiter.clone(),
    ));

    match cli.command {
        Command::Channels => {
            for channel in catalog.list().await? {
                println!("{:>3}  {}  [{}]", channel.index, channel.name, channel.identifier);
            }
        }
        Command::Current { channel } => {
            let channel = catalog.resolve(&ChannelRef::parse(&channel)).await?;
            let song = aggregator.current_song(&channel).await?;
            println!("{}: {} by {}", channel.name, song.title, song.artist);
        }
        Command::Previous { channel } => {
            let channel = catalog.resolve(&ChannelRef::parse(&channel)).await?;
            for song in aggregator.previous_songs(&channel).await? {
                println!("{} by {}", song.title, song.artist);
            }
        }
        Command::Songs { channel } => {
            let channel = catalog.resolve(&ChannelRef::parse(&channel)).await?;
            for (pos, song) in aggregator.all_songs(&channel).await?.iter().enumerate() {
                let marker = if pos == 0 { "▶" } else { " " };
                println!("{marker} {} by {}", song.title, song.artist);
            }
        }
        Command::All => {
            let corpus = aggregator.all_channels_data().await?;
            for snapshot in &corpus.channels {
                println!("{} [{}]", snapshot.channel.name, snapshot.channel.identifier);
                println!("  now: {} by {}", snapshot.current.title, snapshot.current.artist);
                for song in &snapshot.previous {
                    println!("       {} by {}", song.title, song.artist);
                }
            }
            for failure in &corpus.failures {
                eprintln!("{}: unavailable ({})", failure.channel.name, failure.error);
            }
        }
        Command::Identify { query } => {
            let query = query.join(" ");
            let corpus = aggregator.all_channels_data().await?;
            let result = FuzzyIdentifier::new()
                .with_delimiter(cfg.song_delimiter.clone())
                .identify(&query, &corpus)?;
            println!(
                "{} is playing \"{}\" by {} (confidence {:.1})",
                result.channel.name, result.song.title, result.song.artist, result.confidence
            );
        }
        Command::Export { out } => {
            let corpus = aggregator.all_channels_data().await?;
            export::export_corpus(&corpus, &out)?;
            println!(
                "wrote {} channels ({} unavailable) to {}",
                corpus.channels.len(),
                corpus.failures.len(),
                out.display()
            );
        }
        Command::Tui => {
            wpn_tui::run_dashboard(aggregator).await?;
        }
    }

    Ok(())
}

/// Config file (explicit flag, else `wpn.yaml` when present, else defaults),
/// then CLI overrides on top.
fn load_config(cli: &Cli) -> Result<WpnConfig> {
    let mut loader = WpnConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    } else if Path::new("wpn.yaml").exists() {
        loader = loader.with_file("wpn.yaml");
    }
    let mut cfg = loader.load().context("failed to load configuration")?;

    if let Some(base_url) = &cli.base_url {
        cfg.base_url = base_url.clone();
    }
    if let Some(timeout) = cli.timeout {
        cfg.timeout_secs = timeout;
    }
    if let Some(max_in_flight) = cli.max_in_flight {
        cfg.max_in_flight = max_in_flight;
    }
    Ok(cfg)
}
