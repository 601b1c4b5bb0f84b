//! The fixed-layout TCP Timestamp option, matching `struct tshdr` in
//! `examples/original_source/process_pkt.h`: two padding bytes (rather
//! than the single `NOP` the option normally rides after), kind=8,
//! length=10, a 4-byte sender timestamp, and a 4-byte echo timestamp.
//!
//! There is no general TCP options parser; the core assumes this exact
//! 12-byte layout sits immediately after the fixed TCP header, per the
//! outer spec.

use byteorder::{ByteOrder, NetworkEndian};

use super::field::Field;
use super::{Error, Result};

mod field {
    use super::Field;

    pub const PAD1: usize = 0;
    pub const PAD2: usize = 1;
    pub const KIND: usize = 2;
    pub const LENGTH: usize = 3;
    pub const TS_VAL: Field = 4..8;
    pub const TS_ECR: Field = 8..12;
}

pub const HEADER_LEN: usize = 12;
pub const KIND_TIMESTAMP: u8 = 8;

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
        if self.buffer.as_ref().len() < HEADER_LEN {
            return Err(Error);
        }
        Ok(())
    }

    pub fn pad1(&self) -> u8 {
        self.buffer.as_ref()[field::PAD1]
    }

    pub fn pad2(&self) -> u8 {
        self.buffer.as_ref()[field::PAD2]
    }

    pub fn kind(&self) -> u8 {
        self.buffer.as_ref()[field::KIND]
    }

    pub fn length(&self) -> u8 {
        self.buffer.as_ref()[field::LENGTH]
    }

    pub fn ts_val(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[field::TS_VAL])
    }

    pub fn ts_ecr(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[field::TS_ECR])
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_pad1(&mut self, value: u8) {
        self.buffer.as_mut()[field::PAD1] = value;
    }

    pub fn set_pad2(&mut self, value: u8) {
        self.buffer.as_mut()[field::PAD2] = value;
    }

    pub fn set_kind(&mut self, value: u8) {
        self.buffer.as_mut()[field::KIND] = value;
    }

    pub fn set_length(&mut self, value: u8) {
        self.buffer.as_mut()[field::LENGTH] = value;
    }

    pub fn set_ts_val(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[field::TS_VAL], value);
    }

    pub fn set_ts_ecr(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.buffer.as_mut()[field::TS_ECR], value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_val_roundtrip() {
        let mut buf = [0u8; HEADER_LEN];
        let mut ts = Packet::new_unchecked(&mut buf[..]);
        ts.set_kind(KIND_TIMESTAMP);
        ts.set_length(HEADER_LEN as u8);
        ts.set_ts_val(0x0102_0304);
        ts.set_ts_ecr(0x0506_0708);

        let ts = Packet::new_unchecked(&buf[..]);
        assert_eq!(ts.kind(), KIND_TIMESTAMP);
        assert_eq!(ts.length(), HEADER_LEN as u8);
        assert_eq!(ts.ts_val(), 0x0102_0304);
        assert_eq!(ts.ts_ecr(), 0x0506_0708);
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(Packet::new_checked(&[0u8; 4][..]).is_err());
    }
}
