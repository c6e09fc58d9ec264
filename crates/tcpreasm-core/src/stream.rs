//! Per-direction stream tracking
//!
//! Bridges parsed [`TcpSegment`]s to a [`Reassembler`]: picks the initial
//! sequence number, re-seeds on SYN, skips empty segments, and remembers
//! FIN/RST and the last time the stream saw traffic so the owning flow
//! manager can tear it down. Reassembly itself ignores connection state.

use crate::reassembler::{DataSink, Ingest, Reassembler, ReassemblerLimits};
use crate::segment::{FlowKey, TcpSegment};
use crate::seq::seq_add;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// One reassembled direction of a TCP connection
#[derive(Debug)]
pub struct StreamTracker {
    flow: FlowKey,
    reassembler: Reassembler,
    finished: bool,
    last_seen: Instant,
}

impl StreamTracker {
    /// Start tracking from the first segment seen in this direction
    ///
    /// A SYN consumes one sequence number, so data is expected at `seq + 1`.
    /// Without a SYN the stream was picked up mid-flight and the segment's
    /// own sequence number is the first byte expected.
    pub fn from_first_segment(segment: &TcpSegment, limits: ReassemblerLimits) -> Self {
        let initial_seq = if segment.is_syn() {
            seq_add(segment.seq, 1)
        } else {
            segment.seq
        };
        debug!(flow = %segment.flow, initial_seq, syn = segment.is_syn(), "new stream");

        Self {
            flow: segment.flow,
            reassembler: Reassembler::with_limits(initial_seq, limits),
            finished: false,
            last_seen: Instant::now(),
        }
    }

    /// Register the consumer of this direction's byte stream
    pub fn set_sink<S>(&mut self, sink: S)
    where
        S: DataSink + 'static,
    {
        self.reassembler.set_sink(sink);
    }

    /// Feed a segment of this direction
    ///
    /// A SYN rewinds the expected sequence number even after data has been
    /// delivered. A SYN that late means a new connection on the same
    /// addresses; callers should start a fresh tracker rather than feed it
    /// here (see [`is_expired`](Self::is_expired)).
    pub fn process(&mut self, segment: &TcpSegment) -> Ingest {
        self.touch();

        if segment.is_fin() || segment.is_rst() {
            trace!(flow = %self.flow, fin = segment.is_fin(), rst = segment.is_rst(), "stream finished");
            self.finished = true;
        }

        let mut seq = segment.seq;
        if segment.is_syn() {
            seq = seq_add(seq, 1);
            self.reassembler.reset(seq);
        }

        if segment.payload().is_empty() {
            return Ingest::Empty;
        }
        self.reassembler.ingest(seq, segment.payload())
    }

    /// Direction this tracker follows
    pub fn flow(&self) -> FlowKey {
        self.flow
    }

    /// Underlying reassembler
    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// FIN or RST has been observed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Record activity now
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Last time a segment was processed
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Time since the last processed segment
    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Idle for at least `timeout`
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.idle_for() >= timeout
    }

    /// Finished or idle past `timeout`; the stream can be torn down
    pub fn is_expired(&self, idle_timeout: Duration) -> bool {
        self.finished || self.is_idle(idle_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::TcpFlags;
    use bytes::Bytes;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn key() -> FlowKey {
        FlowKey::new("10.0.0.1:40000".parse().unwrap(), "10.0.0.2:80".parse().unwrap())
    }

    fn segment(seq: u32, flags: TcpFlags, payload: &'static [u8]) -> TcpSegment {
        TcpSegment::new(key(), seq, flags, Bytes::from_static(payload))
    }

    #[test]
    fn test_syn_seeds_next_seq() {
        let tracker = StreamTracker::from_first_segment(
            &segment(1000, TcpFlags::SYN, b""),
            ReassemblerLimits::default(),
        );
        assert_eq!(tracker.reassembler().next_seq(), 1001);
    }

    #[test]
    fn test_midstream_pickup_seeds_at_segment() {
        let tracker = StreamTracker::from_first_segment(
            &segment(5000, TcpFlags::ACK, b"data"),
            ReassemblerLimits::default(),
        );
        assert_eq!(tracker.reassembler().next_seq(), 5000);
    }

    #[test]
    fn test_handshake_then_data() {
        let out = Rc::new(RefCell::new(Vec::new()));
        let sink = out.clone();

        let syn = segment(0xFFFF_FFFF, TcpFlags::SYN, b"");
        let mut tracker = StreamTracker::from_first_segment(&syn, ReassemblerLimits::default());
        tracker.set_sink(move |data: &[u8]| sink.borrow_mut().extend_from_slice(data));

        assert_eq!(tracker.process(&syn), Ingest::Empty);
        tracker.process(&segment(4, TcpFlags::ACK, b"world"));
        tracker.process(&segment(0, TcpFlags::ACK | TcpFlags::PSH, b"hell"));
        assert_eq!(&*out.borrow(), b"hellworld");
    }

    #[test]
    fn test_fin_marks_finished() {
        let first = segment(1, TcpFlags::ACK, b"x");
        let mut tracker = StreamTracker::from_first_segment(&first, ReassemblerLimits::default());
        tracker.process(&first);
        assert!(!tracker.is_finished());

        tracker.process(&segment(2, TcpFlags::FIN | TcpFlags::ACK, b""));
        assert!(tracker.is_finished());
        assert_eq!(tracker.reassembler().next_seq(), 2);
    }

    #[test]
    fn test_idle() {
        let tracker = StreamTracker::from_first_segment(
            &segment(1, TcpFlags::ACK, b""),
            ReassemblerLimits::default(),
        );
        assert!(tracker.is_idle(Duration::ZERO));
        assert!(!tracker.is_idle(Duration::from_secs(3600)));
    }

    #[test]
    fn test_expired_when_finished_or_idle() {
        let first = segment(1, TcpFlags::ACK, b"");
        let mut tracker = StreamTracker::from_first_segment(&first, ReassemblerLimits::default());
        let timeout = Duration::from_secs(3600);
        assert!(!tracker.is_expired(timeout));
        assert!(tracker.is_expired(Duration::ZERO));

        tracker.process(&segment(1, TcpFlags::RST, b""));
        assert!(tracker.is_expired(timeout));
    }
}
