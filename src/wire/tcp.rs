//! TCP header view, in the teacher's `Packet<T: AsRef<[u8]>>` idiom.
//!
//! Only the fixed 20-byte header is modeled; there is no generic TCP
//! options parser; `options_and_payload()` just hands back everything
//! after byte 20 for `tsopt::Packet` to reinterpret.

use byteorder::{ByteOrder, NetworkEndian};

use super::field::Field;
use super::{Error, Result};

mod field {
    use super::Field;

    pub const SRC_PORT: Field = 0..2;
    pub const DST_PORT: Field = 2..4;
    pub const SEQ: Field = 4..8;
    pub const ACK: Field = 8..12;
    pub const DATA_OFFSET: usize = 12;
    pub const FLAGS: usize = 13;
    pub const WINDOW: Field = 14..16;
    pub const CHECKSUM: Field = 16..18;
    pub const URGENT_PTR: Field = 18..20;
}

pub const MIN_HEADER_LEN: usize = 20;

pub const FLAG_FIN: u8 = 0x01;
pub const FLAG_SYN: u8 = 0x02;
pub const FLAG_RST: u8 = 0x04;
pub const FLAG_PSH: u8 = 0x08;
pub const FLAG_ACK: u8 = 0x10;
pub const FLAG_URG: u8 = 0x20;
#[allow(unused)]
pub const FLAG_ECE: u8 = 0x40;
#[allow(unused)]
pub const FLAG_CWR: u8 = 0x80;

/// A TCP sequence (or acknowledgment) number.
///
/// Ordinary `u32` ordering, not wraparound-aware arithmetic: the core only
/// ever compares a captured trigger sequence number against freshly
/// observed ones within a single short-lived congestion episode, never
/// across a wraparound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNumber(pub u32);

impl SeqNumber {
    pub const fn new(value: u32) -> SeqNumber {
        SeqNumber(value)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < MIN_HEADER_LEN {
            return Err(Error);
        }
        if self.header_len() < MIN_HEADER_LEN || len < self.header_len() {
            return Err(Error);
        }
        Ok(())
    }

    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::SRC_PORT])
    }

    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::DST_PORT])
    }

    pub fn seq_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_u32(&self.buffer.as_ref()[field::SEQ]))
    }

    pub fn ack_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_u32(&self.buffer.as_ref()[field::ACK]))
    }

    pub fn data_offset(&self) -> u8 {
        self.buffer.as_ref()[field::DATA_OFFSET] >> 4
    }

    pub fn header_len(&self) -> usize {
        self.data_offset() as usize * 4
    }

    fn flags(&self) -> u8 {
        self.buffer.as_ref()[field::FLAGS]
    }

    pub fn fin(&self) -> bool {
        self.flags() & FLAG_FIN != 0
    }

    pub fn syn(&self) -> bool {
        self.flags() & FLAG_SYN != 0
    }

    pub fn rst(&self) -> bool {
        self.flags() & FLAG_RST != 0
    }

    pub fn psh(&self) -> bool {
        self.flags() & FLAG_PSH != 0
    }

    pub fn ack(&self) -> bool {
        self.flags() & FLAG_ACK != 0
    }

    pub fn urg(&self) -> bool {
        self.flags() & FLAG_URG != 0
    }

    pub fn window(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::WINDOW])
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::CHECKSUM])
    }

    pub fn urgent_ptr(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::URGENT_PTR])
    }

    /// Everything past the fixed 20-byte header: TCP options, then payload.
    pub fn options_and_payload(&self) -> &[u8] {
        &self.buffer.as_ref()[MIN_HEADER_LEN..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::SRC_PORT], value);
    }

    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::DST_PORT], value);
    }

    pub fn set_seq_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[field::SEQ], value.0);
    }

    pub fn set_ack_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[field::ACK], value.0);
    }

    /// `words` is the data offset in 32-bit words (standard TCP encoding).
    pub fn set_data_offset(&mut self, words: u8) {
        let byte = &mut self.buffer.as_mut()[field::DATA_OFFSET];
        *byte = (words << 4) | (*byte & 0x0f);
    }

    pub fn set_flags(&mut self, flags: u8) {
        self.buffer.as_mut()[field::FLAGS] = flags;
    }

    pub fn set_window(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::WINDOW], value);
    }

    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::CHECKSUM], value);
    }

    pub fn set_urgent_ptr(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::URGENT_PTR], value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_roundtrip() {
        let mut buf = [0u8; 20];
        let mut p = Packet::new_unchecked(&mut buf[..]);
        p.set_data_offset(5);
        p.set_flags(FLAG_ACK | FLAG_PSH);

        let p = Packet::new_unchecked(&buf[..]);
        assert!(p.ack());
        assert!(p.psh());
        assert!(!p.syn());
        assert!(!p.fin());
        assert!(!p.rst());
        assert!(!p.urg());
        assert_eq!(p.header_len(), 20);
    }

    #[test]
    fn seq_and_ack_roundtrip() {
        let mut buf = [0u8; 20];
        let mut p = Packet::new_unchecked(&mut buf[..]);
        p.set_seq_number(SeqNumber::new(0xdead_beef));
        p.set_ack_number(SeqNumber::new(0x1234_5678));

        let p = Packet::new_unchecked(&buf[..]);
        assert_eq!(p.seq_number(), SeqNumber::new(0xdead_beef));
        assert_eq!(p.ack_number(), SeqNumber::new(0x1234_5678));
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(Packet::new_checked(&[0u8; 10][..]).is_err());
    }
}
