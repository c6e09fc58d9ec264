//! Segment type definitions

use bitflags::bitflags;
use std::fmt;
use std::net::SocketAddr;

/// IP protocol number for TCP
pub const IPPROTO_TCP: u8 = 6;

/// IP version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

bitflags! {
    /// TCP header flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TcpFlags: u8 {
        /// No more data from sender
        const FIN = 0x01;
        /// Synchronize sequence numbers
        const SYN = 0x02;
        /// Reset the connection
        const RST = 0x04;
        /// Push function
        const PSH = 0x08;
        /// Acknowledgment field significant
        const ACK = 0x10;
        /// Urgent pointer field significant
        const URG = 0x20;
        /// ECN echo
        const ECE = 0x40;
        /// Congestion window reduced
        const CWR = 0x80;
    }
}

/// One direction of a TCP connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    /// Sender of the segments
    pub src: SocketAddr,
    /// Receiver of the segments
    pub dst: SocketAddr,
}

impl FlowKey {
    /// Create a flow key
    pub fn new(src: SocketAddr, dst: SocketAddr) -> Self {
        Self { src, dst }
    }

    /// The opposite direction of the same connection
    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}
