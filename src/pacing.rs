//! The paced bidirectional I/O scheduler.
//!
//! Grounded on `examples/original_source/simpletun_advanced.c::io_timeout`
//! and its caller in `main`'s event loop: compute the nearer of two
//! per-direction deadlines, wait for input readiness up to that deadline,
//! and only consult write-readiness when the wait times out with nothing
//! to read. The teacher's `phy::sys::wait` (`libc::select` over one fd)
//! is the basis for [`crate::device::Readiness`]; this module only
//! decides *what* to wait for and *what happened*, it never touches a
//! file descriptor directly.

use crate::time::{Duration, Instant};

/// Default pacing interval: 20 packets per second in each direction.
pub fn default_pacing_interval() -> Duration {
    Duration::from_micros(50_000)
}

/// Which of the two directions a deadline or action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Packets flowing tap → socket.
    TapToSock,
    /// Packets flowing socket → tap.
    SockToTap,
}

/// Per-direction scheduled-dequeue state: either idle, or armed with a
/// deadline at which the next queued packet should be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    Idle,
    At(Instant),
}

/// What the event loop should do this tick, as decided by [`Scheduler::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub tap_readable: bool,
    pub sock_readable: bool,
    pub write_decision: Option<WriteDecision>,
}

/// A write was due this tick: which direction, and whether the
/// destination fd was actually write-ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteDecision {
    pub direction: Direction,
    pub ready: bool,
}

/// Multiplexes read- and write-readiness over two file descriptors with an
/// optional timeout. Implemented by [`crate::device::select::SelectReadiness`]
/// for the real tap/socket fds, and by an in-memory mock in tests.
pub trait Readiness {
    /// Block for up to `timeout` (or indefinitely if `None`) waiting for
    /// either fd to become readable. Returns which became readable.
    fn wait_readable(&mut self, timeout: Option<Duration>) -> std::io::Result<(bool, bool)>;

    /// Zero-timeout poll of write-readiness for both fds.
    fn poll_writable(&mut self) -> std::io::Result<(bool, bool)>;
}

pub struct Scheduler {
    interval: Duration,
    tap_to_sock: Deadline,
    sock_to_tap: Deadline,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Scheduler {
        Scheduler {
            interval,
            tap_to_sock: Deadline::Idle,
            sock_to_tap: Deadline::Idle,
        }
    }

    /// Arm a direction's deadline if it is currently idle — called when a
    /// queue transitions from empty to non-empty.
    pub fn arm_if_idle(&mut self, direction: Direction, now: Instant) {
        let deadline = self.deadline_mut(direction);
        if *deadline == Deadline::Idle {
            *deadline = Deadline::At(now + self.interval);
        }
    }

    /// Clear a direction's deadline — called when its queue drains to empty.
    pub fn disarm(&mut self, direction: Direction) {
        *self.deadline_mut(direction) = Deadline::Idle;
    }

    fn deadline_mut(&mut self, direction: Direction) -> &mut Deadline {
        match direction {
            Direction::TapToSock => &mut self.tap_to_sock,
            Direction::SockToTap => &mut self.sock_to_tap,
        }
    }

    fn deadline(&self, direction: Direction) -> Deadline {
        match direction {
            Direction::TapToSock => self.tap_to_sock,
            Direction::SockToTap => self.sock_to_tap,
        }
    }

    /// Run one scheduler tick: wait for input readiness bounded by the
    /// nearer armed deadline, arm newly-readable directions that were
    /// idle, and on timeout poll write-readiness for the nearer deadline's
    /// direction.
    pub fn tick(
        &mut self,
        readiness: &mut dyn Readiness,
        now: Instant,
    ) -> std::io::Result<TickOutcome> {
        let (timeout, which) = self.pick_timeout(now);

        let (tap_readable, sock_readable) = readiness.wait_readable(timeout)?;
        let any_readable = tap_readable || sock_readable;

        if tap_readable {
            self.arm_if_idle(Direction::TapToSock, now);
        }
        if sock_readable {
            self.arm_if_idle(Direction::SockToTap, now);
        }

        let write_decision = if any_readable {
            None
        } else {
            which.map(|direction| {
                let (tap_writable, sock_writable) = readiness
                    .poll_writable()
                    .unwrap_or((false, false));
                let ready = match direction {
                    Direction::TapToSock => sock_writable,
                    Direction::SockToTap => tap_writable,
                };
                if ready {
                    self.advance(direction, now);
                }
                WriteDecision { direction, ready }
            })
        };

        Ok(TickOutcome {
            tap_readable,
            sock_readable,
            write_decision,
        })
    }

    /// Advance a direction's deadline by one interval from `now`, as if a
    /// packet had just been sent. The event loop calls this again after
    /// actually dequeuing and writing; `tick` calls it only for the
    /// overrun-free write path so the two don't double-advance — see
    /// `Tunnel::run`, which re-arms from the post-dequeue queue state
    /// instead of trusting this call when the queue is left empty.
    pub fn advance(&mut self, direction: Direction, now: Instant) {
        *self.deadline_mut(direction) = Deadline::At(now + self.interval);
    }

    fn pick_timeout(&self, now: Instant) -> (Option<Duration>, Option<Direction>) {
        let tap = self.remaining(Direction::TapToSock, now);
        let sock = self.remaining(Direction::SockToTap, now);

        match (tap, sock) {
            (None, None) => (None, None),
            (Some(d), None) => (Some(d), Some(Direction::TapToSock)),
            (None, Some(d)) => (Some(d), Some(Direction::SockToTap)),
            (Some(dt), Some(ds)) => {
                if dt <= ds {
                    (Some(dt), Some(Direction::TapToSock))
                } else {
                    (Some(ds), Some(Direction::SockToTap))
                }
            }
        }
    }

    fn remaining(&self, direction: Direction, now: Instant) -> Option<Duration> {
        match self.deadline(direction) {
            Deadline::Idle => None,
            Deadline::At(deadline) => Some(deadline.saturating_duration_since(now)),
        }
    }
}
