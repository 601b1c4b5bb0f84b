//! The event loop: glues the scheduler, the two queues, the
//! congestion-spoofing state machine, and the tap/socket devices
//! together, per `examples/original_source/simpletun_advanced.c`'s
//! `main` loop (the `FDTAP_IN_RDY`/`FDSOCK_IN_RDY`/`FDTAP_OUT_OK`/
//! `FDSOCK_OUT_OK` branches).

use std::net::TcpListener;
use std::os::unix::io::AsRawFd;

use anyhow::Context;
use log::{debug, info, warn};

use crate::config::{Mode, TunnelConfig};
use crate::device::{Frame, SelectReadiness, SockDevice, TunTapDevice};
use crate::packet::{Packet, MAX_FRAME_LEN};
use crate::pacing::{self, Direction, Scheduler};
use crate::queue::PacketQueue;
use crate::spoof::{SockToTapAction, SpoofState};
use crate::time::Instant;

/// Queue capacity; matches the original's `#define QUEUE_SIZE` default.
const QUEUE_CAPACITY: usize = 100;

pub struct Tunnel {
    tap: TunTapDevice,
    sock: SockDevice,
    readiness: SelectReadiness,
    scheduler: Scheduler,
    spoof: SpoofState,
    qtap: PacketQueue,
    qsock: PacketQueue,
}

impl Tunnel {
    /// Establishes the tap device and the TCP connection (client connect
    /// or server accept) described by `config`, matching the original's
    /// `cliserv` branch in `main`.
    pub fn establish(config: &TunnelConfig) -> anyhow::Result<Tunnel> {
        let tap = TunTapDevice::new(&config.if_name, config.medium).with_context(|| context!())?;
        info!("attached to interface {}", config.if_name);

        let sock = match &config.mode {
            Mode::Server => {
                let listener = TcpListener::bind(("0.0.0.0", config.port))
                    .with_context(|| context!())?;
                info!("listening on port {}", config.port);
                let sock = SockDevice::accept(&listener).with_context(|| context!())?;
                info!("client connected");
                sock
            }
            Mode::Client { remote_addr } => {
                let addr: std::net::SocketAddr = format!("{remote_addr}:{}", config.port)
                    .parse()
                    .with_context(|| context!())?;
                let sock = SockDevice::connect(addr).with_context(|| context!())?;
                info!("connected to server {remote_addr}");
                sock
            }
        };

        let readiness = SelectReadiness::new(tap.as_raw_fd(), sock.as_raw_fd());

        Ok(Tunnel {
            tap,
            sock,
            readiness,
            scheduler: Scheduler::new(pacing::default_pacing_interval()),
            spoof: SpoofState::new(),
            qtap: PacketQueue::new("Qtap", QUEUE_CAPACITY),
            qsock: PacketQueue::new("Qsock", QUEUE_CAPACITY),
        })
    }

    /// Runs the event loop until a terminal socket condition (EOF or
    /// error) occurs.
    pub fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let now = Instant::now();
            let outcome = self
                .scheduler
                .tick(&mut self.readiness, now)
                .with_context(|| context!())?;

            if outcome.tap_readable {
                self.handle_tap_readable(now)?;
            }
            if outcome.sock_readable {
                if !self.handle_sock_readable(now)? {
                    info!("peer closed connection, shutting down");
                    return Ok(());
                }
            }

            if let Some(decision) = outcome.write_decision {
                if decision.ready {
                    match decision.direction {
                        Direction::TapToSock => self.flush_tap_to_sock(now)?,
                        Direction::SockToTap => self.flush_sock_to_tap(now)?,
                    }
                } else {
                    debug!("{:?} write overrun this tick", decision.direction);
                }
            }
        }
    }

    fn handle_tap_readable(&mut self, now: Instant) -> anyhow::Result<()> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = match self.tap.recv(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e).with_context(|| context!()),
        };
        if n == 0 {
            warn!("short read from tap, dropping");
            return Ok(());
        }

        let frame = &buf[..n];
        if self.spoof.should_suppress(frame) {
            debug!("suppressing retransmission of trigger sequence");
            return Ok(());
        }

        let packet = Packet::new(frame, now);
        match self.qtap.enqueue(packet) {
            Ok(()) => {
                self.spoof.on_tap_enqueued(frame, self.qtap.count());
                self.scheduler.arm_if_idle(Direction::TapToSock, now);
            }
            Err((_overflow, packet)) => {
                warn!("Qtap overflow, dropping {} byte packet", packet.len());
            }
        }
        Ok(())
    }

    /// Returns `Ok(false)` on a clean EOF at a frame boundary (terminal).
    fn handle_sock_readable(&mut self, now: Instant) -> anyhow::Result<bool> {
        let frame = match self.sock.recv_frame() {
            Ok(Frame::Data(data)) => data,
            Ok(Frame::Eof) => return Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(true),
            Err(e) => return Err(e).with_context(|| context!()),
        };

        self.spoof.observe_sock_enqueue();
        let packet = Packet::new(&frame, now);
        match self.qsock.enqueue(packet) {
            Ok(()) => self.scheduler.arm_if_idle(Direction::SockToTap, now),
            Err((_overflow, packet)) => {
                warn!("Qsock overflow, dropping {} byte packet", packet.len());
            }
        }
        Ok(true)
    }

    fn flush_tap_to_sock(&mut self, now: Instant) -> anyhow::Result<()> {
        if let Some(packet) = self.qtap.dequeue() {
            self.sock
                .send_frame(packet.as_bytes())
                .with_context(|| context!())?;
        }
        if self.qtap.is_empty() {
            self.scheduler.disarm(Direction::TapToSock);
        } else {
            self.scheduler.arm_if_idle(Direction::TapToSock, now);
        }
        Ok(())
    }

    fn flush_sock_to_tap(&mut self, now: Instant) -> anyhow::Result<()> {
        if let Some(packet) = self.qsock.dequeue() {
            match self.spoof.dequeue_sock_to_tap(packet) {
                SockToTapAction::Forward(packet) => {
                    self.tap.send(packet.as_bytes()).with_context(|| context!())?;
                }
                SockToTapAction::Burst { dup_acks } => {
                    for dup_ack in dup_acks {
                        self.tap.send(&dup_ack).with_context(|| context!())?;
                    }
                }
                SockToTapAction::Drop => {}
            }
        }
        if self.qsock.is_empty() {
            self.scheduler.disarm(Direction::SockToTap);
        } else {
            self.scheduler.arm_if_idle(Direction::SockToTap, now);
        }
        Ok(())
    }
}
