//! Packets command - reassemble one direction of a hex packet dump
//!
//! Input is one hex-encoded IP packet per line. Blank lines and lines
//! starting with `#` are skipped. The first TCP packet picks the direction
//! to follow; packets of any other flow are ignored. A SYN on that direction
//! after FIN/RST, or after the configured idle timeout, starts a new stream.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tcpreasm_core::{Config, StreamTracker, TcpSegment};
use tracing::{debug, info, warn};

use crate::output::{print_stats, Output};

/// Packets command arguments
#[derive(Args, Debug)]
pub struct PacketsArgs {
    /// Packet dump, one hex-encoded IP packet per line
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Write the stream to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print reassembler counters as JSON on stderr
    #[arg(long)]
    pub stats: bool,
}

/// Execute packets command
pub fn execute(args: PacketsArgs, config: &Config) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let output = Output::open(args.output.as_deref())?;
    let idle_timeout = config.stream.idle_timeout();
    let start = |segment: &TcpSegment| {
        let mut tracker = StreamTracker::from_first_segment(segment, config.reassembly.limits());
        tracker.set_sink(output.sink());
        tracker
    };
    let mut tracker: Option<StreamTracker> = None;
    let mut skipped = 0usize;

    for (line_no, line) in content.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let packet = hex::decode(line)
            .with_context(|| format!("{}:{line_no}: invalid hex", args.file.display()))?;
        let segment = match TcpSegment::parse(&packet) {
            Ok(segment) => segment,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping packet");
                skipped += 1;
                continue;
            }
        };

        let tracker = tracker.get_or_insert_with(|| {
            info!(flow = %segment.flow, "following stream");
            start(&segment)
        });

        if segment.flow != tracker.flow() {
            debug!(line = line_no, flow = %segment.flow, "other direction, skipped");
            skipped += 1;
            continue;
        }

        if segment.is_syn() && tracker.is_expired(idle_timeout) {
            info!(line = line_no, flow = %segment.flow, "new connection, restarting stream");
            *tracker = start(&segment);
        }

        let outcome = tracker.process(&segment);
        debug!(line = line_no, seq = segment.seq, len = segment.payload_len(), ?outcome, "segment processed");
    }

    let written = output.finish()?;
    let Some(tracker) = tracker else {
        warn!("no TCP packets found");
        return Ok(());
    };

    info!(
        bytes = written,
        skipped,
        finished = tracker.is_finished(),
        pending = tracker.reassembler().pending_segments(),
        "packets finished"
    );

    if args.stats {
        print_stats(tracker.reassembler())?;
    }
    Ok(())
}
