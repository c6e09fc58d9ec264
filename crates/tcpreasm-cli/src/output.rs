//! Destination for the reassembled stream

use anyhow::{Context, Result};
use serde_json::json;
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use tcpreasm_core::Reassembler;

/// Shared writer that a reassembler sink can feed
///
/// The sink cannot return errors, so the first write failure is parked
/// here and reported by [`Output::finish`]. Later chunks are discarded.
#[derive(Clone)]
pub struct Output {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    writer: Box<dyn Write>,
    error: Option<io::Error>,
    bytes: u64,
}

impl Output {
    /// Write to `path`, or stdout when `None`
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let writer: Box<dyn Write> = match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file {}", path.display()))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(io::stdout())),
        };

        Ok(Self {
            inner: Rc::new(RefCell::new(Inner {
                writer,
                error: None,
                bytes: 0,
            })),
        })
    }

    /// A sink closure writing into this output
    pub fn sink(&self) -> impl FnMut(&[u8]) + 'static {
        let inner = Rc::clone(&self.inner);
        move |data: &[u8]| {
            let mut inner = inner.borrow_mut();
            if inner.error.is_some() {
                return;
            }
            match inner.writer.write_all(data) {
                Ok(()) => inner.bytes += data.len() as u64,
                Err(e) => inner.error = Some(e),
            }
        }
    }

    /// Flush and surface any write error
    pub fn finish(self) -> Result<u64> {
        let mut inner = self.inner.borrow_mut();
        if let Some(e) = inner.error.take() {
            return Err(e).context("Failed to write reassembled stream");
        }
        inner
            .writer
            .flush()
            .context("Failed to flush reassembled stream")?;
        Ok(inner.bytes)
    }
}

/// Print the reassembler's state and counters as JSON on stderr
pub fn print_stats(reassembler: &Reassembler) -> Result<()> {
    let report = json!({
        "next_seq": reassembler.next_seq(),
        "pending_segments": reassembler.pending_segments(),
        "pending_bytes": reassembler.pending_bytes(),
        "stats": reassembler.stats(),
    });
    let text = serde_json::to_string_pretty(&report).context("Failed to serialize stats")?;
    eprintln!("{text}");
    Ok(())
}
