//! TCP segment extraction
//!
//! Pulls the fields reassembly needs (addresses, sequence number, flags,
//! payload) out of a raw IPv4 or IPv6 packet. IP fragments are rejected;
//! defragmentation happens upstream if at all.

mod builder;
mod types;

pub use builder::PacketBuilder;
pub use types::*;

use crate::error::{Error, Result};
use bytes::Bytes;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Minimum IPv4 header length
const IPV4_MIN_HEADER: usize = 20;

/// Fixed IPv6 header length
const IPV6_HEADER: usize = 40;

/// Minimum TCP header length
const TCP_MIN_HEADER: usize = 20;

/// A TCP segment lifted out of an IP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    /// Direction the segment travels in
    pub flow: FlowKey,
    /// IP version it arrived over
    pub ip_version: IpVersion,
    /// Sequence number of the first payload byte (or of the SYN)
    pub seq: u32,
    /// Acknowledgment number
    pub ack: u32,
    /// TCP flags
    pub flags: TcpFlags,
    /// Advertised window
    pub window: u16,
    payload: Bytes,
}

impl TcpSegment {
    /// Create a segment directly, without a packet
    pub fn new(flow: FlowKey, seq: u32, flags: TcpFlags, payload: impl Into<Bytes>) -> Self {
        let ip_version = match flow.src.ip() {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        };
        Self {
            flow,
            ip_version,
            seq,
            ack: 0,
            flags,
            window: 0,
            payload: payload.into(),
        }
    }

    /// Parse a raw IP packet
    pub fn parse(data: &[u8]) -> Result<Self> {
        let Some(first) = data.first() else {
            return Err(Error::PacketTooSmall {
                expected: IPV4_MIN_HEADER,
                actual: 0,
            });
        };

        match first >> 4 {
            4 => Self::parse_ipv4(data),
            6 => Self::parse_ipv6(data),
            version => Err(Error::UnsupportedIpVersion(version)),
        }
    }

    /// Parse IPv4 header, then the TCP header behind it
    fn parse_ipv4(data: &[u8]) -> Result<Self> {
        if data.len() < IPV4_MIN_HEADER {
            return Err(Error::PacketTooSmall {
                expected: IPV4_MIN_HEADER,
                actual: data.len(),
            });
        }

        let header_len = usize::from(data[0] & 0x0F) * 4;
        if header_len < IPV4_MIN_HEADER {
            return Err(Error::packet_parse_at(
                format!("Invalid IPv4 header length: {header_len}"),
                0,
            ));
        }
        if data.len() < header_len {
            return Err(Error::PacketTooSmall {
                expected: header_len,
                actual: data.len(),
            });
        }

        let total_len = usize::from(u16::from_be_bytes([data[2], data[3]]));
        if total_len < header_len {
            return Err(Error::packet_parse_at(
                format!("IPv4 total length {total_len} shorter than header"),
                2,
            ));
        }

        let fragment = u16::from_be_bytes([data[6], data[7]]);
        let more_fragments = fragment & 0x2000 != 0;
        let fragment_offset = fragment & 0x1FFF;
        if more_fragments || fragment_offset != 0 {
            return Err(Error::packet_parse_at("Fragmented IPv4 packet", 6));
        }

        let protocol = data[9];
        if protocol != IPPROTO_TCP {
            return Err(Error::NotTcp { protocol });
        }

        let src = IpAddr::V4(Ipv4Addr::new(data[12], data[13], data[14], data[15]));
        let dst = IpAddr::V4(Ipv4Addr::new(data[16], data[17], data[18], data[19]));

        // Trailing link-layer padding is not part of the packet.
        let end = total_len.min(data.len());
        Self::parse_tcp(data, header_len, end, src, dst, IpVersion::V4)
    }

    /// Parse IPv6 header (no extension headers), then TCP
    fn parse_ipv6(data: &[u8]) -> Result<Self> {
        if data.len() < IPV6_HEADER {
            return Err(Error::PacketTooSmall {
                expected: IPV6_HEADER,
                actual: data.len(),
            });
        }

        let next_header = data[6];
        if next_header != IPPROTO_TCP {
            return Err(Error::NotTcp {
                protocol: next_header,
            });
        }

        let payload_len = usize::from(u16::from_be_bytes([data[4], data[5]]));

        let mut src_bytes = [0u8; 16];
        let mut dst_bytes = [0u8; 16];
        src_bytes.copy_from_slice(&data[8..24]);
        dst_bytes.copy_from_slice(&data[24..40]);
        let src = IpAddr::V6(Ipv6Addr::from(src_bytes));
        let dst = IpAddr::V6(Ipv6Addr::from(dst_bytes));

        let end = (IPV6_HEADER + payload_len).min(data.len());
        Self::parse_tcp(data, IPV6_HEADER, end, src, dst, IpVersion::V6)
    }

    /// Parse the TCP header in `data[offset..end]`
    fn parse_tcp(
        data: &[u8],
        offset: usize,
        end: usize,
        src: IpAddr,
        dst: IpAddr,
        ip_version: IpVersion,
    ) -> Result<Self> {
        if end < offset + TCP_MIN_HEADER {
            return Err(Error::PacketTooSmall {
                expected: offset + TCP_MIN_HEADER,
                actual: end,
            });
        }

        let tcp = &data[offset..end];
        let src_port = u16::from_be_bytes([tcp[0], tcp[1]]);
        let dst_port = u16::from_be_bytes([tcp[2], tcp[3]]);
        let seq = u32::from_be_bytes([tcp[4], tcp[5], tcp[6], tcp[7]]);
        let ack = u32::from_be_bytes([tcp[8], tcp[9], tcp[10], tcp[11]]);

        let header_len = usize::from(tcp[12] >> 4) * 4;
        if header_len < TCP_MIN_HEADER || header_len > tcp.len() {
            return Err(Error::packet_parse_at(
                format!("Invalid TCP data offset: {header_len}"),
                offset + 12,
            ));
        }

        let flags = TcpFlags::from_bits_truncate(tcp[13]);
        let window = u16::from_be_bytes([tcp[14], tcp[15]]);

        Ok(Self {
            flow: FlowKey::new(SocketAddr::new(src, src_port), SocketAddr::new(dst, dst_port)),
            ip_version,
            seq,
            ack,
            flags,
            window,
            payload: Bytes::copy_from_slice(&tcp[header_len..]),
        })
    }

    /// TCP payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Check if TCP SYN flag is set
    pub fn is_syn(&self) -> bool {
        self.flags.contains(TcpFlags::SYN)
    }

    /// Check if TCP FIN flag is set
    pub fn is_fin(&self) -> bool {
        self.flags.contains(TcpFlags::FIN)
    }

    /// Check if TCP RST flag is set
    pub fn is_rst(&self) -> bool {
        self.flags.contains(TcpFlags::RST)
    }
}
