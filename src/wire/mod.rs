/*! Low-level packet access and construction, in the style of the teacher
crate's `wire` module: each wire format gets a `Packet<T: AsRef<[u8]>>`
read/write wrapper over a byte slice, a `field` submodule of `Range<usize>`
constants, and free functions for the pieces that don't need a wrapper type
(checksums, classification, fabrication).

This module only speaks IPv4 + TCP + the fixed-layout Timestamp option —
the core's scope per the outer spec. There is no generic TCP-option parser,
no IPv6, and no `Repr` convenience layer beyond what the dup-ACK path needs.
*/

mod checksum;
mod dupack;
pub(crate) mod ipv4;
pub(crate) mod tcp;
pub(crate) mod tsopt;

pub use checksum::internet_checksum;
pub use dupack::fabricate_dup_ack;
pub use ipv4::Packet as Ipv4Packet;
pub use tcp::{Packet as TcpPacket, SeqNumber as TcpSeqNumber};
pub use tsopt::{Packet as TimestampOption, HEADER_LEN as TIMESTAMP_OPTION_LEN};

pub(crate) mod field {
    pub type Field = core::ops::Range<usize>;
    #[allow(unused)]
    pub type Rest = core::ops::RangeFrom<usize>;
}

/// Parsing a packet failed: it is malformed, too short, or not the shape
/// the dup-ACK/classification path expects (non-IPv4, non-TCP, IP options
/// present, missing Timestamp option).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "wire::Error")
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Returns `true` iff `frame` is an IPv4+TCP segment, ACK set, no other
/// flags, and zero payload bytes — a "pure ACK" per the outer spec's
/// glossary. Returns `false` (not an error) for anything else, including
/// non-TCP and malformed frames, matching `CheckPureTCPAck` in
/// `examples/original_source/process_pkt.c`.
pub fn is_pure_tcp_ack(frame: &[u8]) -> bool {
    let Ok(ip) = Ipv4Packet::new_checked(frame) else {
        return false;
    };
    if ip.protocol() != ipv4::PROTOCOL_TCP {
        return false;
    }
    let Ok(tcp) = TcpPacket::new_checked(ip.payload()) else {
        return false;
    };
    if !tcp.ack() || tcp.urg() || tcp.psh() || tcp.rst() || tcp.syn() || tcp.fin() {
        return false;
    }
    let payload_len = ip
        .total_len()
        .saturating_sub(ip.header_len() + tcp.header_len());
    payload_len == 0
}

/// Returns the TCP sequence number of an IPv4+TCP frame.
pub fn tcp_seq_number(frame: &[u8]) -> Result<TcpSeqNumber> {
    let ip = Ipv4Packet::new_checked(frame)?;
    let tcp = TcpPacket::new_checked(ip.payload())?;
    Ok(tcp.seq_number())
}

/// Returns the TCP ACK number, or `Error` if the ACK flag is clear or the
/// frame is malformed.
pub fn tcp_ack_number(frame: &[u8]) -> Result<TcpSeqNumber> {
    let ip = Ipv4Packet::new_checked(frame)?;
    let tcp = TcpPacket::new_checked(ip.payload())?;
    if !tcp.ack() {
        return Err(Error);
    }
    Ok(tcp.ack_number())
}

/// Returns `TSval` from the fixed-layout Timestamp option immediately
/// following the TCP header, assuming that layout is present.
pub fn tcp_timestamp_value(frame: &[u8]) -> Result<u32> {
    let ip = Ipv4Packet::new_checked(frame)?;
    let tcp = TcpPacket::new_checked(ip.payload())?;
    let ts = tsopt::Packet::new_checked(tcp.options_and_payload())?;
    Ok(ts.ts_val())
}
