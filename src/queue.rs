//! Bounded FIFO packet queue with occupancy metrics.
//!
//! Grounded on `examples/original_source/queue.c`/`queue.h` (`pktqueue_t`):
//! a circular buffer that wastes one slot so `front == rear` unambiguously
//! means empty, plus an EWMA of occupancy updated on every enqueue/dequeue.

use crate::packet::Packet;

/// EWMA weight, matching `queue.c`'s file-level `float a = 0.5`.
const EWMA_ALPHA: f32 = 0.5;

/// Returned when `enqueue` is called on a full queue. The caller retains
/// ownership of the packet and is responsible for discarding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow;

/// A bounded circular buffer of packets, with byte and smoothed-count metrics.
///
/// `Qname` is carried purely for diagnostics, matching `pktqueue_t::Qname`.
pub struct PacketQueue {
    name: &'static str,
    slots: Vec<Option<Packet>>,
    capacity: usize,
    front: usize,
    rear: usize,
    count: usize,
    byte_count: usize,
    smoothed_count: f32,
}

impl PacketQueue {
    /// `capacity` is the total slot count, matching `queue_init`'s
    /// `buffer_size` argument; one slot is always left unused to
    /// distinguish full from empty, so the queue holds `capacity - 1`
    /// packets at most.
    pub fn new(name: &'static str, capacity: usize) -> PacketQueue {
        assert!(capacity > 1, "queue capacity must hold at least one packet");
        PacketQueue {
            name,
            slots: (0..capacity).map(|_| None).collect(),
            capacity,
            front: 0,
            rear: 0,
            count: 0,
            byte_count: 0,
            smoothed_count: 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_empty(&self) -> bool {
        self.front == self.rear
    }

    pub fn is_full(&self) -> bool {
        (self.rear + 1) % self.capacity == self.front
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    pub fn smoothed_count(&self) -> f32 {
        self.smoothed_count
    }

    fn update_ewma(&mut self) {
        self.smoothed_count =
            (1.0 - EWMA_ALPHA) * self.smoothed_count + EWMA_ALPHA * self.count as f32;
    }

    /// Enqueue `packet`. On overflow, the queue is left unchanged and the
    /// caller gets `packet` back to discard.
    pub fn enqueue(&mut self, packet: Packet) -> Result<(), (Overflow, Packet)> {
        let next_rear = (self.rear + 1) % self.capacity;
        if next_rear == self.front {
            return Err((Overflow, packet));
        }
        self.byte_count += packet.len();
        self.rear = next_rear;
        self.slots[self.rear] = Some(packet);
        self.count += 1;
        self.update_ewma();
        Ok(())
    }

    /// Non-consuming peek at the oldest queued packet.
    pub fn front(&self) -> Option<&Packet> {
        if self.is_empty() {
            None
        } else {
            let next_front = (self.front + 1) % self.capacity;
            self.slots[next_front].as_ref()
        }
    }

    /// Remove and return the oldest queued packet, or `None` if empty.
    pub fn dequeue(&mut self) -> Option<Packet> {
        if self.is_empty() {
            return None;
        }
        self.front = (self.front + 1) % self.capacity;
        let packet = self.slots[self.front].take().expect("front slot occupied");
        self.count -= 1;
        self.byte_count -= packet.len();
        self.update_ewma();
        Some(packet)
    }
}
