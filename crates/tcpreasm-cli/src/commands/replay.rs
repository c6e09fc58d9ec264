//! Replay command - feed a segment script through a reassembler

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tcpreasm_core::{Config, Ingest, Reassembler, SegmentScript};
use tracing::{debug, info};

use crate::output::{print_stats, Output};

/// Replay command arguments
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Segment script (TOML)
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Write the stream to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print reassembler counters as JSON on stderr
    #[arg(long)]
    pub stats: bool,
}

/// Execute replay command
pub fn execute(args: ReplayArgs, config: &Config) -> Result<()> {
    let script = SegmentScript::load(&args.script)
        .with_context(|| format!("Failed to load script {}", args.script.display()))?;
    debug!(
        initial_seq = script.initial_seq,
        entries = script.entries.len(),
        "loaded segment script"
    );

    let output = Output::open(args.output.as_deref())?;
    let mut reassembler = Reassembler::with_limits(script.initial_seq, config.reassembly.limits());
    reassembler.set_sink(output.sink());

    let outcomes = script
        .apply(&mut reassembler)
        .with_context(|| format!("Invalid script {}", args.script.display()))?;
    for (index, outcome) in outcomes.iter().enumerate() {
        debug!(index, ?outcome, "segment ingested");
    }

    let dropped = outcomes.iter().filter(|o| **o == Ingest::Dropped).count();
    let written = output.finish()?;
    info!(
        bytes = written,
        next_seq = reassembler.next_seq(),
        pending = reassembler.pending_segments(),
        dropped,
        "replay finished"
    );

    if args.stats {
        print_stats(&reassembler)?;
    }
    Ok(())
}
