//! Unidirectional TCP stream reassembly
//!
//! A [`Reassembler`] turns segments observed on the wire (out of order,
//! overlapping, retransmitted) into one ordered byte stream handed to a
//! [`DataSink`]. Bytes are delivered exactly once, in stream order.
//!
//! Segments that arrive ahead of the delivery point are deep-copied into an
//! ordered pending store and released by the drain pass once the gap in
//! front of them closes. The store can be capped with [`ReassemblerLimits`].

use crate::seq::{compare, distance, seq_add, SeqOrdering, SEQ_HALF_SPACE};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Consumer of the reassembled byte stream
///
/// Invoked synchronously once per contiguous chunk, in increasing stream
/// order. The slice is only valid for the duration of the call.
pub trait DataSink {
    /// Receive the next chunk of the stream
    fn on_data(&mut self, data: &[u8]);
}

impl<F> DataSink for F
where
    F: FnMut(&[u8]),
{
    fn on_data(&mut self, data: &[u8]) {
        self(data)
    }
}

/// What to do when buffering a segment would exceed the pending limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Refuse to buffer the incoming segment
    #[default]
    DropNew,
    /// Evict the buffered segments furthest from the delivery point
    EvictFurthest,
}

/// Caps on the out-of-order store
///
/// `None` means unlimited. The default is fully unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReassemblerLimits {
    /// Maximum number of buffered segments
    pub max_segments: Option<usize>,
    /// Maximum number of buffered payload bytes
    pub max_bytes: Option<usize>,
    /// Policy applied when a limit would be exceeded
    pub overflow: OverflowPolicy,
}

impl ReassemblerLimits {
    /// No caps at all
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Whether any cap is configured
    pub fn is_bounded(&self) -> bool {
        self.max_segments.is_some() || self.max_bytes.is_some()
    }
}

/// Result of a single [`Reassembler::ingest`] call
///
/// Describes what happened to the ingested segment itself. Buffered data
/// released by the drain pass in the same call is not reflected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// Zero-length payload, nothing to do
    Empty,
    /// Everything in the segment was already delivered or already buffered
    Duplicate,
    /// Delivered to the sink immediately
    Delivered {
        /// Leading bytes were already delivered and got cut off
        trimmed: bool,
    },
    /// Stored in the pending buffer until the gap before it closes
    Buffered {
        /// Leading bytes were already delivered and got cut off
        trimmed: bool,
    },
    /// Not buffered because of the pending limits
    Dropped,
}

/// Counters kept by a [`Reassembler`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReassemblerStats {
    /// Non-empty segments ingested
    pub segments: u64,
    /// Segments discarded as already seen
    pub duplicates: u64,
    /// Segments whose prefix overlapped delivered data
    pub trimmed: u64,
    /// Segments placed in the pending buffer
    pub buffered: u64,
    /// Segments refused by the overflow policy
    pub overflow_drops: u64,
    /// Buffered segments evicted by the overflow policy
    pub evictions: u64,
    /// Chunks handed to the sink
    pub chunks_delivered: u64,
    /// Bytes handed to the sink
    pub bytes_delivered: u64,
}

/// Outcome of filing a payload into the pending store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stored {
    Inserted,
    Replaced,
    Kept,
    Rejected,
}

/// Reassembler for one direction of a TCP connection
///
/// Single-threaded by contract: every mutating call takes `&mut self`.
pub struct Reassembler {
    /// Sequence number of the next byte the sink has not seen
    next_seq: u32,
    /// Out-of-order segments keyed by start sequence
    pending: BTreeMap<u32, Bytes>,
    /// Sum of buffered payload lengths
    pending_bytes: usize,
    limits: ReassemblerLimits,
    sink: Option<Box<dyn DataSink>>,
    stats: ReassemblerStats,
}

impl Reassembler {
    /// Create a reassembler expecting `initial_seq` as the first byte
    pub fn new(initial_seq: u32) -> Self {
        Self::with_limits(initial_seq, ReassemblerLimits::default())
    }

    /// Create a reassembler with caps on the pending buffer
    pub fn with_limits(initial_seq: u32, limits: ReassemblerLimits) -> Self {
        trace!(initial_seq, ?limits, "new reassembler");
        Self {
            next_seq: initial_seq,
            pending: BTreeMap::new(),
            pending_bytes: 0,
            limits,
            sink: None,
            stats: ReassemblerStats::default(),
        }
    }

    /// Register the consumer of the ordered stream, replacing any previous one
    pub fn set_sink<S>(&mut self, sink: S)
    where
        S: DataSink + 'static,
    {
        self.sink = Some(Box::new(sink));
    }

    /// Remove the registered sink
    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Whether a sink is registered
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Overwrite the expected sequence number
    ///
    /// Buffered segments are kept; the next [`ingest`](Self::ingest) drains
    /// whatever became deliverable relative to the new position.
    pub fn reset(&mut self, seq: u32) {
        debug!(
            from = self.next_seq,
            to = seq,
            pending = self.pending.len(),
            "resetting expected sequence"
        );
        self.next_seq = seq;
    }

    /// Feed one segment starting at `seq`
    ///
    /// The sink may be called any number of times before this returns.
    pub fn ingest(&mut self, seq: u32, data: &[u8]) -> Ingest {
        if data.is_empty() {
            return Ingest::Empty;
        }
        self.stats.segments += 1;

        let outcome = self.place(seq, data);
        self.drain();
        outcome
    }

    /// Sequence number of the next undelivered byte
    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Number of buffered segments
    pub fn pending_segments(&self) -> usize {
        self.pending.len()
    }

    /// Number of buffered payload bytes
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    /// Configured caps
    pub fn limits(&self) -> &ReassemblerLimits {
        &self.limits
    }

    /// Counters since construction
    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }

    /// Discard, trim, deliver or buffer the incoming segment
    fn place(&mut self, seq: u32, data: &[u8]) -> Ingest {
        let end = seq_add(seq, data.len());
        if compare(end, self.next_seq) == SeqOrdering::Before {
            trace!(seq, len = data.len(), next_seq = self.next_seq, "retransmission discarded");
            self.stats.duplicates += 1;
            return Ingest::Duplicate;
        }

        let mut seq = seq;
        let mut data = data;
        let mut trimmed = false;
        if compare(seq, self.next_seq) == SeqOrdering::Before {
            let covered = distance(seq, self.next_seq) as usize;
            data = data.get(covered..).unwrap_or_default();
            if data.is_empty() {
                // Ends exactly at the delivery point.
                self.stats.duplicates += 1;
                return Ingest::Duplicate;
            }
            trace!(seq, covered, next_seq = self.next_seq, "trimmed delivered prefix");
            seq = self.next_seq;
            trimmed = true;
            self.stats.trimmed += 1;
        }

        if seq == self.next_seq {
            self.deliver(data);
            return Ingest::Delivered { trimmed };
        }

        match self.store(seq, Bytes::copy_from_slice(data)) {
            Stored::Inserted | Stored::Replaced => {
                self.stats.buffered += 1;
                Ingest::Buffered { trimmed }
            }
            Stored::Kept => {
                self.stats.duplicates += 1;
                Ingest::Duplicate
            }
            Stored::Rejected => {
                self.stats.overflow_drops += 1;
                debug!(
                    seq,
                    len = data.len(),
                    pending = self.pending.len(),
                    pending_bytes = self.pending_bytes,
                    "pending buffer full, segment dropped"
                );
                Ingest::Dropped
            }
        }
    }

    /// Release every buffered segment that the delivery point has reached
    fn drain(&mut self) {
        while let Some(key) = self.first_pending_key() {
            match compare(key, self.next_seq) {
                SeqOrdering::After => break,
                SeqOrdering::Equal => {
                    let Some(payload) = self.take_pending(key) else {
                        break;
                    };
                    self.deliver(&payload);
                }
                SeqOrdering::Before => {
                    let Some(payload) = self.take_pending(key) else {
                        break;
                    };
                    let fragment_end = seq_add(key, payload.len());
                    if compare(fragment_end, self.next_seq) == SeqOrdering::After {
                        let covered = distance(key, self.next_seq) as usize;
                        let next_seq = self.next_seq;
                        trace!(key, covered, next_seq, "re-filing partially covered segment");
                        // Kept when an entry at least as long already sits at
                        // next_seq; that entry covers this remainder.
                        self.store(next_seq, payload.slice(covered..));
                    } else {
                        trace!(key, len = payload.len(), "buffered segment already delivered");
                    }
                }
            }
        }
    }

    fn deliver(&mut self, data: &[u8]) {
        match self.sink.as_mut() {
            Some(sink) => sink.on_data(data),
            None => trace!(len = data.len(), "no sink registered, chunk dropped"),
        }
        self.next_seq = seq_add(self.next_seq, data.len());
        self.stats.chunks_delivered += 1;
        self.stats.bytes_delivered += data.len() as u64;
    }

    /// Keys are ordered circularly starting just past half the space behind
    /// `next_seq`, so already-covered keys come first, then `next_seq`, then
    /// keys still ahead of it.
    fn circular_origin(&self) -> u32 {
        self.next_seq.wrapping_add(SEQ_HALF_SPACE).wrapping_add(1)
    }

    fn first_pending_key(&self) -> Option<u32> {
        let origin = self.circular_origin();
        self.pending
            .range(origin..)
            .next()
            .or_else(|| self.pending.range(..origin).next())
            .map(|(key, _)| *key)
    }

    fn furthest_pending_key(&self) -> Option<u32> {
        let origin = self.circular_origin();
        self.pending
            .range(..origin)
            .next_back()
            .or_else(|| self.pending.range(origin..).next_back())
            .map(|(key, _)| *key)
    }

    fn take_pending(&mut self, key: u32) -> Option<Bytes> {
        let payload = self.pending.remove(&key)?;
        self.pending_bytes -= payload.len();
        Some(payload)
    }

    /// Insert, or replace only with a strictly longer payload
    fn store(&mut self, seq: u32, payload: Bytes) -> Stored {
        let existing = self.pending.get(&seq).map(Bytes::len);
        if let Some(len) = existing {
            if payload.len() <= len {
                return Stored::Kept;
            }
        }

        let growth = payload.len() - existing.unwrap_or(0);
        let new_entries = usize::from(existing.is_none());
        if !self.make_room(seq, payload.len(), growth, new_entries) {
            return Stored::Rejected;
        }

        self.pending_bytes += growth;
        self.pending.insert(seq, payload);
        match existing {
            Some(_) => Stored::Replaced,
            None => Stored::Inserted,
        }
    }

    fn fits(&self, growth: usize, new_entries: usize) -> bool {
        self.fits_after_freeing(0, 0, growth, new_entries)
    }

    fn fits_after_freeing(
        &self,
        freed_entries: usize,
        freed_bytes: usize,
        growth: usize,
        new_entries: usize,
    ) -> bool {
        let segments_ok = self.limits.max_segments.map_or(true, |max| {
            self.pending.len() - freed_entries + new_entries <= max
        });
        let bytes_ok = self
            .limits
            .max_bytes
            .map_or(true, |max| self.pending_bytes - freed_bytes + growth <= max);
        segments_ok && bytes_ok
    }

    fn make_room(&mut self, seq: u32, len: usize, growth: usize, new_entries: usize) -> bool {
        if self.fits(growth, new_entries) {
            return true;
        }
        if self.limits.max_bytes.is_some_and(|max| len > max) {
            return false;
        }

        match self.limits.overflow {
            OverflowPolicy::DropNew => false,
            OverflowPolicy::EvictFurthest => {
                let origin = self.circular_origin();
                let offset = |key: u32| key.wrapping_sub(origin);

                // Only entries strictly further ahead than the incoming
                // segment may be evicted; nothing is evicted unless that is
                // enough to make it fit.
                let (freed_entries, freed_bytes) = self
                    .pending
                    .iter()
                    .filter(|(key, _)| offset(**key) > offset(seq))
                    .fold((0, 0), |(count, bytes), (_, payload)| {
                        (count + 1, bytes + payload.len())
                    });
                if !self.fits_after_freeing(freed_entries, freed_bytes, growth, new_entries) {
                    return false;
                }

                while !self.fits(growth, new_entries) {
                    let Some(furthest) = self.furthest_pending_key() else {
                        return false;
                    };
                    if offset(furthest) <= offset(seq) {
                        return false;
                    }
                    if let Some(evicted) = self.take_pending(furthest) {
                        self.stats.evictions += 1;
                        debug!(key = furthest, len = evicted.len(), "evicted buffered segment");
                    }
                }
                true
            }
        }
    }
}

impl fmt::Debug for Reassembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reassembler")
            .field("next_seq", &self.next_seq)
            .field("pending_segments", &self.pending.len())
            .field("pending_bytes", &self.pending_bytes)
            .field("limits", &self.limits)
            .field("has_sink", &self.sink.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Drop for Reassembler {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            trace!(
                segments = self.pending.len(),
                bytes = self.pending_bytes,
                "releasing undelivered segments"
            );
        }
    }
}
