//! Corpus serialisation for the `export` subcommand.
//!
//! One JSON object per channel, keyed by channel name, each with `current`
//! and `previous` fields. Channels that failed during aggregation are kept
//! under a separate `failures` key so a consumer never mistakes them for
//! empty listings.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use wpn_common::Corpus;

pub fn export_corpus(corpus: &Corpus, path: &Path) -> Result<()> {
    let doc = build_document(corpus);
    let file = File::create(path)
        .with_context(|| format!("failed to create export file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &doc)
        .with_context(|| format!("failed to write export file: {}", path.display()))?;
    tracing::info!(
        target: "export",
        path = %path.display(),
        channels = corpus.channels.len(),
        failures = corpus.failures.len(),
        "export.written"
    );
    Ok(())
}

fn build_document(corpus: &Corpus) -> Value {
    let mut channels = Map::new();
    for snapshot in &corpus.channels {
        channels.insert(
            snapshot.channel.name.clone(),
            json!({
                "current": snapshot.current,
                "previous": snapshot.previous,
            }),
        );
    }

    let mut failures = Map::new();
    for failure in &corpus.failures {
        failures.insert(failure.channel.name.clone(), json!(failure.error));
    }

    json!({
        "channels": channels,
        "failures": failures,
    })
}
