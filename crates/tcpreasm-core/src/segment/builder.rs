//! Raw packet builder for fixtures and replay files

use super::{TcpFlags, IPPROTO_TCP};
use bytes::BytesMut;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Builder for raw IPv4/IPv6 TCP packets
///
/// Checksums are left zero; the parser does not verify them.
pub struct PacketBuilder {
    src: SocketAddr,
    dst: SocketAddr,
    ttl: u8,
    flags: TcpFlags,
    seq: u32,
    ack: u32,
    payload: Vec<u8>,
}

impl PacketBuilder {
    /// Create a builder for a packet from `src` to `dst`
    ///
    /// Both addresses must be of the same family.
    pub fn tcp(src: SocketAddr, dst: SocketAddr) -> Self {
        Self {
            src,
            dst,
            ttl: 64,
            flags: TcpFlags::ACK,
            seq: 0,
            ack: 0,
            payload: Vec::new(),
        }
    }

    /// Builder with unspecified IPv4 endpoints
    pub fn tcp_v4() -> Self {
        let any = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
        Self::tcp(any, any)
    }

    /// Set TTL / hop limit
    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set TCP flags
    pub fn flags(mut self, flags: TcpFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set sequence number
    pub fn seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    /// Set acknowledgment number
    pub fn ack(mut self, ack: u32) -> Self {
        self.ack = ack;
        self
    }

    /// Set payload
    pub fn payload(mut self, data: &[u8]) -> Self {
        self.payload = data.to_vec();
        self
    }

    /// Build the packet
    pub fn build(self) -> Vec<u8> {
        let tcp_len = 20 + self.payload.len();
        let mut packet = BytesMut::with_capacity(40 + tcp_len);

        match (self.src.ip(), self.dst.ip()) {
            (IpAddr::V6(src), IpAddr::V6(dst)) => {
                packet.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
                packet.extend_from_slice(&(tcp_len as u16).to_be_bytes());
                packet.extend_from_slice(&[IPPROTO_TCP, self.ttl]);
                packet.extend_from_slice(&src.octets());
                packet.extend_from_slice(&dst.octets());
            }
            (src, dst) => {
                let total_len = (20 + tcp_len) as u16;
                packet.extend_from_slice(&[0x45, 0x00]);
                packet.extend_from_slice(&total_len.to_be_bytes());
                packet.extend_from_slice(&[
                    0x00, 0x00, // Identification
                    0x40, 0x00, // Flags (DF) + Fragment Offset
                    self.ttl,
                    IPPROTO_TCP,
                    0x00, 0x00, // Header Checksum
                ]);
                packet.extend_from_slice(&ipv4_octets(src));
                packet.extend_from_slice(&ipv4_octets(dst));
            }
        }

        packet.extend_from_slice(&self.src.port().to_be_bytes());
        packet.extend_from_slice(&self.dst.port().to_be_bytes());
        packet.extend_from_slice(&self.seq.to_be_bytes());
        packet.extend_from_slice(&self.ack.to_be_bytes());
        packet.extend_from_slice(&[
            0x50,              // Data Offset (5 * 4 = 20 bytes)
            self.flags.bits(), // Flags
            0xFF, 0xFF,        // Window Size
            0x00, 0x00,        // Checksum
            0x00, 0x00,        // Urgent Pointer
        ]);
        packet.extend_from_slice(&self.payload);

        packet.to_vec()
    }
}

fn ipv4_octets(addr: IpAddr) -> [u8; 4] {
    match addr {
        IpAddr::V4(v4) => v4.octets(),
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or([0; 4], |v4| v4.octets()),
    }
}
