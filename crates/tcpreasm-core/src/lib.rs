//! # tcpreasm core
//!
//! Reassembles unidirectional TCP byte streams for packet-inspection
//! pipelines.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Sequence arithmetic** - RFC 1982 circular comparison of 32-bit sequence numbers
//! - **Stream reassembly** - ordering, trimming and de-duplication of segments
//! - **Segment extraction** - TCP fields from raw IPv4/IPv6 packets
//! - **Stream tracking** - SYN seeding and FIN/RST/idle bookkeeping per direction
//! - **Configuration** - TOML-backed pending buffer limits
//!
//! ## Example
//!
//! ```rust
//! use tcpreasm_core::Reassembler;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let stream = Rc::new(RefCell::new(Vec::new()));
//! let sink = stream.clone();
//!
//! let mut reassembler = Reassembler::new(100);
//! reassembler.set_sink(move |data: &[u8]| sink.borrow_mut().extend_from_slice(data));
//!
//! reassembler.ingest(110, b"BBBBB");
//! reassembler.ingest(100, b"AAAAAAAAAA");
//!
//! assert_eq!(&*stream.borrow(), b"AAAAAAAAAABBBBB");
//! assert_eq!(reassembler.next_seq(), 115);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod reassembler;
pub mod script;
pub mod segment;
pub mod seq;
pub mod stream;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use reassembler::{DataSink, Ingest, OverflowPolicy, Reassembler, ReassemblerLimits, ReassemblerStats};
pub use script::SegmentScript;
pub use segment::{FlowKey, TcpFlags, TcpSegment};
pub use seq::{compare, SeqOrdering};
pub use stream::StreamTracker;
