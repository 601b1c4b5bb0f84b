//! Internet checksum (RFC 1071), matching the teacher's `wire::ip::checksum`
//! module in shape but not in byte order: the original `csum()` in
//! `examples/original_source/process_pkt.c` walks the buffer as
//! `unsigned short *`, i.e. native-endian 16-bit words, not network-endian
//! ones. Callers are responsible for having already placed network-order
//! field values into the buffer; this function only sums and folds.

use byteorder::{ByteOrder, NativeEndian};

const fn propagate_carries(word: u32) -> u16 {
    let sum = (word >> 16) + (word & 0xffff);
    ((sum >> 16) as u16) + (sum as u16)
}

/// Sum `data` as native-endian 16-bit words (with a trailing odd byte
/// folded in low, matching the C `oddbyte` union's little-endian store),
/// fold twice, and complement.
///
/// Equivalent to `process_pkt.c::csum`, including its convention that the
/// checksum field itself must be zeroed in `data` before calling.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut accum: u32 = 0;
    let mut rest = data;
    while rest.len() >= 2 {
        accum += NativeEndian::read_u16(rest) as u32;
        rest = &rest[2..];
    }
    if let Some(&last) = rest.first() {
        accum += last as u32;
    }
    !propagate_carries(accum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_empty_is_all_ones() {
        assert_eq!(internet_checksum(&[]), 0xffff);
    }

    #[test]
    fn checksum_roundtrips_to_zero() {
        // Any buffer with its checksum field zeroed, then filled with
        // its own checksum, checksums to zero (RFC 1071 self-check).
        let mut buf = vec![0x45u8, 0x00, 0x00, 0x28, 0x1c, 0x46, 0x40, 0x00, 0x40, 0x06];
        buf.extend_from_slice(&[0u8, 0]); // checksum field, zeroed
        buf.extend_from_slice(&[0xc0, 0xa8, 0x00, 0x01, 0xc0, 0xa8, 0x00, 0x02]);
        let sum = internet_checksum(&buf);
        buf[10] = (sum & 0xff) as u8;
        buf[11] = (sum >> 8) as u8;
        assert_eq!(internet_checksum(&buf), 0);
    }

    #[test]
    fn odd_length_buffer_pads_trailing_byte() {
        let a = internet_checksum(&[0x01, 0x02, 0x03]);
        let b = internet_checksum(&[0x01, 0x02, 0x03, 0x00]);
        assert_eq!(a, b);
    }
}
