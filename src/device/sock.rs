//! The TCP socket device: connect (client) or accept (server), then do
//! length-prefixed frame I/O directly over the raw fd.
//!
//! Grounded on `examples/original_source/simpletun_advanced.c`'s
//! `cliserv` branch in `main` for connection setup, and `cread`/`cwrite`/
//! `read_n` for the framing: a 2-byte big-endian length prefix, then
//! exactly that many payload bytes, looped to absorb short reads. Framing
//! is done with raw `libc::read`/`libc::write` rather than
//! `std::io::Read`/`Write` so that readiness polling on the same fd
//! (via [`super::readiness::SelectReadiness`]) stays meaningful —
//! `TcpStream`'s internal buffering would otherwise let `select` report
//! "nothing to read" while buffered bytes remain.

#![allow(unsafe_code)]

use std::io;
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};

use byteorder::{BigEndian, ByteOrder};

use crate::packet::MAX_FRAME_LEN;

/// `Ok(None)` means a clean EOF was hit exactly at a frame boundary —
/// i.e. before any bytes of the next length prefix arrived. Any other
/// short read mid-frame is an `io::Error` of kind `UnexpectedEof`.
pub enum Frame {
    Data(Vec<u8>),
    Eof,
}

pub struct SockDevice {
    stream: TcpStream,
}

impl AsRawFd for SockDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

impl SockDevice {
    pub fn connect(remote: std::net::SocketAddr) -> io::Result<SockDevice> {
        let stream = TcpStream::connect(remote)?;
        stream.set_nonblocking(true)?;
        Ok(SockDevice { stream })
    }

    pub fn accept(listener: &TcpListener) -> io::Result<SockDevice> {
        let (stream, _peer) = listener.accept()?;
        stream.set_nonblocking(true)?;
        Ok(SockDevice { stream })
    }

    fn raw_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let fd = self.stream.as_raw_fd();
        let len = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if len == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(len as usize)
    }

    fn read_n(&mut self, buf: &mut [u8]) -> io::Result<bool> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.raw_read(&mut buf[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed mid-frame",
                ));
            }
            filled += n;
        }
        Ok(true)
    }

    /// Reads one length-prefixed frame. The caller only calls this after
    /// readiness reports the fd readable, so a clean zero-length read of
    /// the length prefix means the peer closed.
    pub fn recv_frame(&mut self) -> io::Result<Frame> {
        let mut len_buf = [0u8; 2];
        if !self.read_n(&mut len_buf)? {
            return Ok(Frame::Eof);
        }
        let len = BigEndian::read_u16(&len_buf) as usize;
        if len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "frame length exceeds MAX_FRAME_LEN",
            ));
        }
        let mut payload = vec![0u8; len];
        if !self.read_n(&mut payload)? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed mid-frame",
            ));
        }
        Ok(Frame::Data(payload))
    }

    /// Writes the length prefix and payload as two separate `write(2)`
    /// calls, matching the original's two-`cwrite` sequence.
    pub fn send_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        let mut len_buf = [0u8; 2];
        BigEndian::write_u16(&mut len_buf, payload.len() as u16);
        self.raw_write(&len_buf)?;
        self.raw_write(payload)?;
        Ok(())
    }

    fn raw_write(&mut self, buf: &[u8]) -> io::Result<()> {
        let fd = self.stream.as_raw_fd();
        let mut written = 0;
        while written < buf.len() {
            let n = unsafe {
                libc::write(
                    fd,
                    buf[written..].as_ptr() as *const libc::c_void,
                    buf.len() - written,
                )
            };
            if n == -1 {
                return Err(io::Error::last_os_error());
            }
            written += n as usize;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

    fn loopback_pair() -> (SockDevice, TcpStream) {
        let listener = TcpListener::bind(SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::LOCALHOST,
            0,
        )))
        .unwrap();
        let addr = listener.local_addr().unwrap();
        let client = std::thread::spawn(move || TcpStream::connect(addr).unwrap());
        let (server, _) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        (SockDevice { stream: server }, client.join().unwrap())
    }

    #[test]
    fn send_frame_then_manual_read_sees_length_prefix() {
        let (mut dev, mut peer) = loopback_pair();
        dev.send_frame(&[1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; 6];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf[..2], &[0, 4]);
        assert_eq!(&buf[2..], &[1, 2, 3, 4]);
    }

    #[test]
    fn recv_frame_assembles_across_partial_writes() {
        let (mut dev, mut peer) = loopback_pair();
        peer.write_all(&[0, 3]).unwrap();
        peer.flush().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        peer.write_all(&[9, 8, 7]).unwrap();

        let frame = loop {
            match dev.recv_frame() {
                Ok(Frame::Data(d)) => break d,
                Ok(Frame::Eof) => panic!("unexpected eof"),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => panic!("unexpected error: {e}"),
            }
        };
        assert_eq!(frame, vec![9, 8, 7]);
    }

    #[test]
    fn recv_frame_reports_eof_at_boundary() {
        let (mut dev, peer) = loopback_pair();
        drop(peer);
        std::thread::sleep(std::time::Duration::from_millis(20));
        match dev.recv_frame().unwrap() {
            Frame::Eof => {}
            Frame::Data(_) => panic!("expected eof"),
        }
    }
}
