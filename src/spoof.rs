//! The backward-congestion-signaling state machine.
//!
//! Grounded on the `in_backward_cc` integer state machine (`-3` idle,
//! `-2` armed, `-1` counting, `>= 0` active-with-round) in
//! `examples/original_source/simpletun_advanced.c`'s main loop, and on
//! `process_pkt.c::create_dupack` for the burst fabrication. Reimplemented
//! as a tagged variant per the outer spec's REDESIGN FLAGS, with the
//! trigger sequence number held as `Option<TcpSeqNumber>` rather than a
//! `-1`-sentinel `unsigned int` to avoid the signed/unsigned comparison
//! trap the original is exposed to.

use crate::wire::{self, TcpSeqNumber};

/// High-water mark on `Qtap.count` that arms a spoofing episode.
pub const HIGH_WATER_MARK: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Armed,
    Counting,
    Active { round: u32 },
}

/// What the event loop should do with a packet dequeued from `Qsock`
/// (socket → tap direction) after consulting the state machine.
#[derive(Debug)]
pub enum SockToTapAction {
    /// Forward the packet to tap unchanged.
    Forward(crate::packet::Packet),
    /// Emit this many fabricated dup-ACKs instead of the dequeued packet,
    /// which is discarded.
    Burst {
        dup_acks: Vec<Vec<u8>>,
    },
    /// Discard the dequeued packet without writing anything to tap.
    Drop,
}

pub struct SpoofState {
    phase: Phase,
    trigger_seq: Option<TcpSeqNumber>,
    ack_template: Option<Vec<u8>>,
    pkt_count: u32,
}

impl SpoofState {
    pub fn new() -> SpoofState {
        SpoofState {
            phase: Phase::Idle,
            trigger_seq: None,
            ack_template: None,
            pkt_count: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Current trigger sequence number, if an episode is in progress.
    pub fn trigger_seq(&self) -> Option<TcpSeqNumber> {
        self.trigger_seq
    }

    /// `true` if a tap-originated frame should be dropped before
    /// enqueueing because its sequence number equals the current
    /// trigger — the retransmission the local sender emits in response
    /// to the spoofed dup-ACKs.
    pub fn should_suppress(&self, frame: &[u8]) -> bool {
        let Some(trigger) = self.trigger_seq else {
            return false;
        };
        matches!(wire::tcp_seq_number(frame), Ok(seq) if seq == trigger)
    }

    /// Called after a tap-originated frame has been enqueued into `Qtap`,
    /// with the queue's occupancy *after* that enqueue. Arms a new
    /// episode if idle and the occupancy crosses [`HIGH_WATER_MARK`];
    /// advances `pkt_count` while counting.
    pub fn on_tap_enqueued(&mut self, frame: &[u8], qtap_count_after_enqueue: usize) {
        if self.phase == Phase::Idle && qtap_count_after_enqueue > HIGH_WATER_MARK {
            if let Ok(seq) = wire::tcp_seq_number(frame) {
                self.phase = Phase::Armed;
                self.trigger_seq = Some(seq);
            }
        }

        if self.phase == Phase::Counting {
            self.pkt_count += 1;
        }
    }

    /// Called when a socket-originated frame is about to be enqueued into
    /// `Qsock` — the `ARMED → COUNTING` transition fires on the first such
    /// enqueue after arming.
    pub fn observe_sock_enqueue(&mut self) {
        if self.phase == Phase::Armed {
            self.phase = Phase::Counting;
            self.pkt_count = 0;
        }
    }

    /// Decide what to do with a packet dequeued from `Qsock` bound for tap.
    pub fn dequeue_sock_to_tap(&mut self, packet: crate::packet::Packet) -> SockToTapAction {
        match self.phase {
            Phase::Idle | Phase::Armed => SockToTapAction::Forward(packet),
            Phase::Counting => {
                if wire::is_pure_tcp_ack(packet.as_bytes()) {
                    self.ack_template = Some(packet.as_bytes().to_vec());
                    self.phase = Phase::Active { round: 1 };
                    SockToTapAction::Forward(packet)
                } else {
                    // Non-pure-ACK dequeues while searching for the
                    // template are dropped, not forwarded.
                    SockToTapAction::Drop
                }
            }
            Phase::Active { round } => {
                let trigger = self.trigger_seq.expect("active phase implies a trigger");
                let ack = wire::tcp_ack_number(packet.as_bytes()).ok();

                if matches!(ack, Some(ack) if ack >= trigger) {
                    self.reset_to_idle();
                    return SockToTapAction::Forward(packet);
                }

                let timestamp = wire::tcp_timestamp_value(packet.as_bytes()).unwrap_or(0);
                let template = self
                    .ack_template
                    .as_ref()
                    .expect("active phase implies a captured template");
                let dup_acks = (0..self.pkt_count)
                    .map(|i| {
                        let plus = (round - 1) * self.pkt_count + i + 1;
                        wire::fabricate_dup_ack(template, plus as u16, timestamp)
                    })
                    .collect();

                self.phase = Phase::Active { round: round + 1 };
                SockToTapAction::Burst { dup_acks }
            }
        }
    }

    fn reset_to_idle(&mut self) {
        self.phase = Phase::Idle;
        self.trigger_seq = None;
        self.ack_template = None;
        self.pkt_count = 0;
    }
}

impl Default for SpoofState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Instant;
    use crate::wire::{ipv4, tcp, tsopt};

    fn build_ack(seq: u32, ack: u32, ts_val: u32) -> Vec<u8> {
        let tcp_hdr = tcp::MIN_HEADER_LEN;
        let ts_len = tsopt::HEADER_LEN;
        let total = ipv4::MIN_HEADER_LEN + tcp_hdr + ts_len;
        let mut buf = vec![0u8; total];
        {
            let mut ip = ipv4::Packet::new_unchecked(&mut buf[..ipv4::MIN_HEADER_LEN]);
            ip.set_version_and_ihl(4, 5);
            ip.set_total_len(total as u16);
            ip.set_protocol(ipv4::PROTOCOL_TCP);
            ip.set_ttl(64);
        }
        let tcp_start = ipv4::MIN_HEADER_LEN;
        let tcp_end = tcp_start + tcp_hdr;
        {
            let mut tcp = tcp::Packet::new_unchecked(&mut buf[tcp_start..tcp_end]);
            tcp.set_data_offset(5 + (ts_len as u8) / 4);
            tcp.set_flags(tcp::FLAG_ACK);
            tcp.set_seq_number(tcp::SeqNumber::new(seq));
            tcp.set_ack_number(tcp::SeqNumber::new(ack));
        }
        {
            let mut ts = tsopt::Packet::new_unchecked(&mut buf[tcp_end..]);
            ts.set_kind(tsopt::KIND_TIMESTAMP);
            ts.set_length(ts_len as u8);
            ts.set_ts_val(ts_val);
        }
        buf
    }

    fn pkt(bytes: &[u8]) -> crate::packet::Packet {
        crate::packet::Packet::new(bytes, Instant::from_micros(0))
    }

    #[test]
    fn arms_on_crossing_high_water_mark() {
        let mut state = SpoofState::new();
        let frame = build_ack(0x1000, 0, 0);
        assert!(!state.should_suppress(&frame));
        state.on_tap_enqueued(&frame, HIGH_WATER_MARK + 1);
        assert_eq!(state.trigger_seq(), Some(tcp::SeqNumber::new(0x1000)));
    }

    #[test]
    fn suppresses_retransmission_of_trigger_seq() {
        let mut state = SpoofState::new();
        let frame = build_ack(0x1000, 0, 0);
        state.on_tap_enqueued(&frame, HIGH_WATER_MARK + 1);

        let retransmit = build_ack(0x1000, 0, 0);
        assert!(state.should_suppress(&retransmit));
    }

    #[test]
    fn full_episode_arms_counts_bursts_and_terminates() {
        let mut state = SpoofState::new();
        let trigger_frame = build_ack(0x1000, 0, 0);
        state.on_tap_enqueued(&trigger_frame, HIGH_WATER_MARK + 1);
        assert_eq!(state.trigger_seq(), Some(tcp::SeqNumber::new(0x1000)));

        state.observe_sock_enqueue();

        for _ in 0..5 {
            state.on_tap_enqueued(&build_ack(0x2000, 0, 0), HIGH_WATER_MARK + 1);
        }

        let template = build_ack(500, 9999, 111);
        match state.dequeue_sock_to_tap(pkt(&template)) {
            SockToTapAction::Forward(_) => {}
            other => panic!("first pure ACK should forward, not {other:?}"),
        }

        let below_trigger = build_ack(500, 0x0500, 777);
        match state.dequeue_sock_to_tap(pkt(&below_trigger)) {
            SockToTapAction::Burst { dup_acks } => assert_eq!(dup_acks.len(), 5),
            other => panic!("expected a burst, got {other:?}"),
        }

        let terminating = build_ack(500, 0x1005, 888);
        match state.dequeue_sock_to_tap(pkt(&terminating)) {
            SockToTapAction::Forward(_) => {}
            other => panic!("ack >= trigger should terminate, not {other:?}"),
        }
        assert!(state.is_idle());
        assert_eq!(state.trigger_seq(), None);
    }

    #[test]
    fn non_pure_ack_dropped_while_searching_for_template() {
        let mut state = SpoofState::new();
        let trigger_frame = build_ack(0x1000, 0, 0);
        state.on_tap_enqueued(&trigger_frame, HIGH_WATER_MARK + 1);
        state.observe_sock_enqueue();
        state.on_tap_enqueued(&build_ack(0x2000, 0, 0), HIGH_WATER_MARK + 1);

        let mut non_pure_ack = build_ack(500, 9999, 111);
        {
            let mut tcp = tcp::Packet::new_unchecked(&mut non_pure_ack[ipv4::MIN_HEADER_LEN..]);
            tcp.set_flags(tcp::FLAG_ACK | tcp::FLAG_PSH);
        }

        match state.dequeue_sock_to_tap(pkt(&non_pure_ack)) {
            SockToTapAction::Drop => {}
            other => panic!("non-pure-ACK while counting should drop, got {other:?}"),
        }
    }
}
