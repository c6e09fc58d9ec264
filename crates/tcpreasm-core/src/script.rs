//! Segment scripts
//!
//! A TOML description of segments as they would arrive on the wire, used to
//! replay reordering and retransmission scenarios through a reassembler:
//!
//! ```toml
//! initial_seq = 100
//!
//! [[segment]]
//! seq = 110
//! text = "BBBBB"
//!
//! [[segment]]
//! reset = 100
//!
//! [[segment]]
//! seq = 100
//! hex = "41414141414141414141"
//! ```

use crate::error::{Error, Result};
use crate::reassembler::{Ingest, Reassembler};
use serde::Deserialize;
use std::path::Path;

/// Parsed segment script
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentScript {
    /// Sequence number of the first expected byte
    pub initial_seq: u32,
    /// Entries in arrival order
    #[serde(default, rename = "segment")]
    pub entries: Vec<ScriptEntry>,
}

/// Raw script entry as written in the file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptEntry {
    /// Segment start sequence
    pub seq: Option<u32>,
    /// UTF-8 payload
    pub text: Option<String>,
    /// Hex-encoded payload
    pub hex: Option<String>,
    /// Reset the expected sequence number instead of ingesting
    pub reset: Option<u32>,
}

/// A validated script step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Ingest `payload` at `seq`
    Segment {
        /// Start sequence
        seq: u32,
        /// Payload bytes
        payload: Vec<u8>,
    },
    /// Reset the expected sequence number
    Reset(u32),
}

impl SegmentScript {
    /// Load a script from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a script from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Validate and decode every entry
    pub fn steps(&self) -> Result<Vec<Step>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| entry.to_step(index))
            .collect()
    }

    /// Fresh reassembler positioned at `initial_seq`
    pub fn reassembler(&self) -> Reassembler {
        Reassembler::new(self.initial_seq)
    }

    /// Run every step against `reassembler`
    ///
    /// Returns the ingest outcome of each segment step, in order. Nothing is
    /// applied if any entry is invalid.
    pub fn apply(&self, reassembler: &mut Reassembler) -> Result<Vec<Ingest>> {
        let steps = self.steps()?;
        let mut outcomes = Vec::with_capacity(steps.len());
        for step in steps {
            match step {
                Step::Segment { seq, payload } => outcomes.push(reassembler.ingest(seq, &payload)),
                Step::Reset(seq) => reassembler.reset(seq),
            }
        }
        Ok(outcomes)
    }
}

impl ScriptEntry {
    fn to_step(&self, index: usize) -> Result<Step> {
        if let Some(seq) = self.reset {
            if self.seq.is_some() || self.text.is_some() || self.hex.is_some() {
                return Err(Error::script(index, "reset entries take no other fields"));
            }
            return Ok(Step::Reset(seq));
        }

        let seq = self
            .seq
            .ok_or_else(|| Error::script(index, "missing 'seq'"))?;
        let payload = match (&self.text, &self.hex) {
            (Some(text), None) => text.as_bytes().to_vec(),
            (None, Some(encoded)) => hex::decode(encoded.trim())?,
            (Some(_), Some(_)) => {
                return Err(Error::script(index, "give either 'text' or 'hex', not both"))
            }
            (None, None) => return Err(Error::script(index, "missing 'text' or 'hex' payload")),
        };

        Ok(Step::Segment { seq, payload })
    }
}
