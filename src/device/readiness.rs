//! `libc::select`-based readiness over the tap and socket file
//! descriptors, implementing [`crate::pacing::Readiness`].
//!
//! Grounded on `KINGFIOX-tapip-rs/src/phy/sys/mod.rs::wait` (one fd, read
//! set only) extended to two fds and a write set, matching
//! `examples/original_source/simpletun_advanced.c::io_timeout`'s two
//! `select` calls (one with a timeout for input readiness, one with a
//! zero timeout for output readiness).

#![allow(unsafe_code)]

use std::io;
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;
use std::ptr;

use crate::pacing::Readiness;
use crate::time::Duration;

pub struct SelectReadiness {
    tap_fd: RawFd,
    sock_fd: RawFd,
}

impl SelectReadiness {
    pub fn new(tap_fd: RawFd, sock_fd: RawFd) -> SelectReadiness {
        SelectReadiness { tap_fd, sock_fd }
    }

    fn select(
        &self,
        want_read: bool,
        want_write: bool,
        timeout: Option<Duration>,
    ) -> io::Result<(bool, bool)> {
        unsafe {
            let mut readfds = MaybeUninit::<libc::fd_set>::uninit();
            libc::FD_ZERO(readfds.as_mut_ptr());
            let mut writefds = MaybeUninit::<libc::fd_set>::uninit();
            libc::FD_ZERO(writefds.as_mut_ptr());

            if want_read {
                libc::FD_SET(self.tap_fd, readfds.as_mut_ptr());
                libc::FD_SET(self.sock_fd, readfds.as_mut_ptr());
            }
            if want_write {
                libc::FD_SET(self.tap_fd, writefds.as_mut_ptr());
                libc::FD_SET(self.sock_fd, writefds.as_mut_ptr());
            }
            let mut readfds = readfds.assume_init();
            let mut writefds = writefds.assume_init();

            let mut timeval = timeout.unwrap_or(Duration::ZERO).as_timeval();
            let timeout_ptr = match timeout {
                Some(_) => &mut timeval as *mut _,
                None => ptr::null_mut(),
            };

            let maxfd = self.tap_fd.max(self.sock_fd) + 1;
            let res = libc::select(
                maxfd,
                &mut readfds,
                &mut writefds,
                ptr::null_mut(),
                timeout_ptr,
            );
            if res == -1 {
                return Err(io::Error::last_os_error());
            }

            let tap_ready = (want_read && libc::FD_ISSET(self.tap_fd, &readfds))
                || (want_write && libc::FD_ISSET(self.tap_fd, &writefds));
            let sock_ready = (want_read && libc::FD_ISSET(self.sock_fd, &readfds))
                || (want_write && libc::FD_ISSET(self.sock_fd, &writefds));
            Ok((tap_ready, sock_ready))
        }
    }
}

impl Readiness for SelectReadiness {
    fn wait_readable(&mut self, timeout: Option<Duration>) -> io::Result<(bool, bool)> {
        self.select(true, false, timeout)
    }

    fn poll_writable(&mut self) -> io::Result<(bool, bool)> {
        self.select(false, true, Some(Duration::ZERO))
    }
}
