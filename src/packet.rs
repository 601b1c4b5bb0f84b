//! The owned, fixed-capacity frame buffer that flows through the queues.
//!
//! Grounded on `examples/original_source/queue.h`'s `packet_t`: a fixed
//! 1500-byte array, a valid length, and an enqueue timestamp. The queue
//! never interprets the buffer; the `wire` module does.

use crate::time::Instant;

/// Maximum IPv4 frame size the tunnel carries. Matches `BUFSIZE`/`packet_t::data`
/// in the original C tunnel (1500 bytes, the classic Ethernet-world MTU).
pub const MAX_FRAME_LEN: usize = 1500;

/// An owned IPv4 frame with a timestamp recording when it entered a queue.
#[derive(Clone)]
pub struct Packet {
    buf: [u8; MAX_FRAME_LEN],
    length: usize,
    enqueue_time: Instant,
}

impl Packet {
    /// Build a packet from frame bytes observed at `enqueue_time`.
    ///
    /// # Panics
    /// Panics if `data.len() > MAX_FRAME_LEN`; callers read frames bounded by
    /// `MAX_FRAME_LEN` from the tap device and socket, so this should never fire.
    pub fn new(data: &[u8], enqueue_time: Instant) -> Packet {
        assert!(data.len() <= MAX_FRAME_LEN, "frame exceeds MAX_FRAME_LEN");
        let mut buf = [0u8; MAX_FRAME_LEN];
        buf[..data.len()].copy_from_slice(data);
        Packet {
            buf,
            length: data.len(),
            enqueue_time,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn enqueue_time(&self) -> Instant {
        self.enqueue_time
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.length]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..self.length]
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("length", &self.length)
            .field("enqueue_time", &self.enqueue_time)
            .finish()
    }
}
