//! Fabricates a duplicate ACK from a captured "pure ACK" template, per
//! `create_dupack` in `examples/original_source/process_pkt.c`.
//!
//! Deliberately reproduces two of that function's quirks rather than
//! fixing them (see the outer spec's Open Questions):
//!
//! - The IP checksum is computed over the *whole* new packet (IP+TCP+TS)
//!   while the TCP and Timestamp-option bytes are still zeroed, not over
//!   the IP header alone and not over the final packet contents. The
//!   original copies the TCP/TS bytes in only *after* computing
//!   `dip->check`.
//! - `TSecr` is copied from the template untouched; only `TSval` is
//!   rewritten to the caller-supplied `timestamp`.

use byteorder::{ByteOrder, NetworkEndian};

use super::checksum::internet_checksum;
use super::ipv4::{self, PROTOCOL_TCP};
use super::tcp;
use super::tsopt;

/// IP header + TCP header + Timestamp option, the only shape this module
/// ever builds (payload-free, option-free apart from the timestamp).
const PACKET_LEN: usize = ipv4::MIN_HEADER_LEN + tcp::MIN_HEADER_LEN + tsopt::HEADER_LEN;

const PSEUDO_HEADER_LEN: usize = 12;

/// Builds a spoofed duplicate ACK from `template` (a captured pure-ACK
/// frame, IP header + TCP header + Timestamp option, no payload).
///
/// `plus` is added to the template's IP identification field (wrapping,
/// matching `htons(ntohs(id) + plus)`); `timestamp` replaces `TSval`.
///
/// # Panics
/// Panics if `template` is shorter than `PACKET_LEN`; callers only ever
/// pass frames that already passed `is_pure_tcp_ack`.
pub fn fabricate_dup_ack(template: &[u8], plus: u16, timestamp: u32) -> Vec<u8> {
    assert!(template.len() >= PACKET_LEN, "dup-ACK template too short");

    let mut dpkt = vec![0u8; PACKET_LEN];
    dpkt[..ipv4::MIN_HEADER_LEN].copy_from_slice(&template[..ipv4::MIN_HEADER_LEN]);

    let orig_id = ipv4::Packet::new_unchecked(&template[..ipv4::MIN_HEADER_LEN]).ident();
    {
        let mut ip = ipv4::Packet::new_unchecked(&mut dpkt[..ipv4::MIN_HEADER_LEN]);
        ip.set_ident(orig_id.wrapping_add(plus));
        ip.set_checksum(0);
    }
    // The IP checksum is taken over the entire packet while the TCP and
    // timestamp bytes are still zero, matching the original's field order.
    let ip_checksum = internet_checksum(&dpkt);
    {
        let mut ip = ipv4::Packet::new_unchecked(&mut dpkt[..ipv4::MIN_HEADER_LEN]);
        ip.set_checksum(ip_checksum);
    }

    let tcp_start = ipv4::MIN_HEADER_LEN;
    let tcp_end = tcp_start + tcp::MIN_HEADER_LEN;
    let ts_end = tcp_end + tsopt::HEADER_LEN;
    dpkt[tcp_start..tcp_end].copy_from_slice(&template[tcp_start..tcp_end]);
    dpkt[tcp_end..ts_end].copy_from_slice(&template[tcp_end..ts_end]);

    {
        let mut tcp = tcp::Packet::new_unchecked(&mut dpkt[tcp_start..tcp_end]);
        tcp.set_checksum(0);
    }
    {
        let mut ts = tsopt::Packet::new_unchecked(&mut dpkt[tcp_end..ts_end]);
        ts.set_ts_val(timestamp);
    }

    let src_addr = ipv4::Packet::new_unchecked(&dpkt[..ipv4::MIN_HEADER_LEN]).src_addr();
    let dst_addr = ipv4::Packet::new_unchecked(&dpkt[..ipv4::MIN_HEADER_LEN]).dst_addr();

    let mut pseudogram = vec![0u8; PSEUDO_HEADER_LEN + tcp::MIN_HEADER_LEN + tsopt::HEADER_LEN];
    pseudogram[0..4].copy_from_slice(&src_addr);
    pseudogram[4..8].copy_from_slice(&dst_addr);
    pseudogram[8] = 0;
    pseudogram[9] = PROTOCOL_TCP;
    NetworkEndian::write_u16(
        &mut pseudogram[10..12],
        (tcp::MIN_HEADER_LEN + tsopt::HEADER_LEN) as u16,
    );
    pseudogram[PSEUDO_HEADER_LEN..].copy_from_slice(&dpkt[tcp_start..ts_end]);

    let tcp_checksum = internet_checksum(&pseudogram);
    let mut tcp = tcp::Packet::new_unchecked(&mut dpkt[tcp_start..tcp_end]);
    tcp.set_checksum(tcp_checksum);

    dpkt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_template(id: u16, ts_val: u32, ts_ecr: u32) -> Vec<u8> {
        let mut buf = vec![0u8; PACKET_LEN];
        {
            let mut ip = ipv4::Packet::new_unchecked(&mut buf[..ipv4::MIN_HEADER_LEN]);
            ip.set_version_and_ihl(4, 5);
            ip.set_total_len(PACKET_LEN as u16);
            ip.set_ident(id);
            ip.set_protocol(PROTOCOL_TCP);
            ip.set_ttl(64);
            ip.set_src_addr([10, 0, 0, 1]);
            ip.set_dst_addr([10, 0, 0, 2]);
        }
        let tcp_start = ipv4::MIN_HEADER_LEN;
        let tcp_end = tcp_start + tcp::MIN_HEADER_LEN;
        {
            let mut tcp = tcp::Packet::new_unchecked(&mut buf[tcp_start..tcp_end]);
            tcp.set_data_offset(5 + (tsopt::HEADER_LEN as u8) / 4);
            tcp.set_flags(tcp::FLAG_ACK);
            tcp.set_seq_number(super::tcp::SeqNumber::new(1000));
            tcp.set_ack_number(super::tcp::SeqNumber::new(2000));
        }
        {
            let mut ts = tsopt::Packet::new_unchecked(&mut buf[tcp_end..]);
            ts.set_kind(tsopt::KIND_TIMESTAMP);
            ts.set_length(tsopt::HEADER_LEN as u8);
            ts.set_ts_val(ts_val);
            ts.set_ts_ecr(ts_ecr);
        }
        buf
    }

    #[test]
    fn ip_id_advances_by_plus() {
        let template = build_template(100, 111, 222);
        let dup = fabricate_dup_ack(&template, 5, 999);
        let ip = ipv4::Packet::new_unchecked(&dup[..ipv4::MIN_HEADER_LEN]);
        assert_eq!(ip.ident(), 105);
    }

    #[test]
    fn ts_val_rewritten_ts_ecr_untouched() {
        let template = build_template(100, 111, 222);
        let dup = fabricate_dup_ack(&template, 1, 999);
        let tcp_start = ipv4::MIN_HEADER_LEN;
        let tcp_end = tcp_start + tcp::MIN_HEADER_LEN;
        let ts = tsopt::Packet::new_unchecked(&dup[tcp_end..]);
        assert_eq!(ts.ts_val(), 999);
        assert_eq!(ts.ts_ecr(), 222);
    }

    #[test]
    fn seq_and_flags_preserved_from_template() {
        let template = build_template(100, 111, 222);
        let dup = fabricate_dup_ack(&template, 1, 999);
        let tcp_start = ipv4::MIN_HEADER_LEN;
        let tcp_end = tcp_start + tcp::MIN_HEADER_LEN;
        let tcp = tcp::Packet::new_unchecked(&dup[tcp_start..tcp_end]);
        assert_eq!(tcp.seq_number(), super::tcp::SeqNumber::new(1000));
        assert_eq!(tcp.ack_number(), super::tcp::SeqNumber::new(2000));
        assert!(tcp.ack());
    }

    #[test]
    fn ip_checksum_is_self_consistent_over_whole_packet() {
        // The checksum was computed while the TCP/TS bytes were still
        // zero, so re-summing the whole packet with those bytes as they
        // are *now* will not generally fold to zero. What must hold is
        // that re-deriving the checksum the same way (IP header final,
        // rest zeroed) reproduces the stored value.
        let template = build_template(100, 111, 222);
        let dup = fabricate_dup_ack(&template, 7, 999);
        let mut recomputed = dup.clone();
        let tcp_start = ipv4::MIN_HEADER_LEN;
        recomputed[tcp_start..].fill(0);
        {
            let mut ip = ipv4::Packet::new_unchecked(&mut recomputed[..tcp_start]);
            ip.set_checksum(0);
        }
        let expected = internet_checksum(&recomputed);
        let ip = ipv4::Packet::new_unchecked(&dup[..tcp_start]);
        assert_eq!(ip.checksum(), expected);
    }

    #[test]
    fn tcp_checksum_validates_against_pseudo_header() {
        let template = build_template(100, 111, 222);
        let dup = fabricate_dup_ack(&template, 2, 999);
        let tcp_start = ipv4::MIN_HEADER_LEN;
        let tcp_end = tcp_start + tcp::MIN_HEADER_LEN;
        let ip = ipv4::Packet::new_unchecked(&dup[..tcp_start]);
        let src = ip.src_addr();
        let dst = ip.dst_addr();

        let mut pseudogram = vec![0u8; PSEUDO_HEADER_LEN + tcp::MIN_HEADER_LEN + tsopt::HEADER_LEN];
        pseudogram[0..4].copy_from_slice(&src);
        pseudogram[4..8].copy_from_slice(&dst);
        pseudogram[9] = PROTOCOL_TCP;
        NetworkEndian::write_u16(
            &mut pseudogram[10..12],
            (tcp::MIN_HEADER_LEN + tsopt::HEADER_LEN) as u16,
        );
        pseudogram[PSEUDO_HEADER_LEN..].copy_from_slice(&dup[tcp_start..]);
        {
            let checksum_field = PSEUDO_HEADER_LEN + 16;
            pseudogram[checksum_field] = 0;
            pseudogram[checksum_field + 1] = 0;
        }
        assert_eq!(internet_checksum(&pseudogram), {
            let tcp = tcp::Packet::new_unchecked(&dup[tcp_start..tcp_end]);
            tcp.checksum()
        });
    }
}
