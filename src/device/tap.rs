//! The tap/tun device: open, attach, query MTU, and do whole-frame
//! non-blocking reads/writes.
//!
//! Grounded on `KINGFIOX-tapip-rs/src/phy/sys/tuntap_interface.rs`
//! (`ifreq_for`/`ifreq_add_flags`/`ifreq_ioctl`, the `TUNSETIFF` dance)
//! and on `examples/original_source/simpletun_advanced.c::tun_alloc` for
//! which flags and device path to use. Unlike the teacher's version,
//! which only ever attaches `IFF_TAP`, this one attaches `IFF_TUN` or
//! `IFF_TAP` depending on [`Medium`], matching the original's `-u`/`-a`
//! switch.

#![allow(unsafe_code)]

use std::io;
use std::mem::MaybeUninit;
use std::os::fd::FromRawFd;
use std::os::unix::io::{AsRawFd, RawFd};

use anyhow::Context;

use crate::config::Medium;

const TUN_PATH: &std::ffi::CStr = c"/dev/net/tun";

#[derive(Debug)]
pub struct TunTapDevice {
    fd: libc::c_int,
}

impl AsRawFd for TunTapDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

fn ifreq_for(name: &str) -> anyhow::Result<libc::ifreq> {
    if name.len() >= libc::IF_NAMESIZE {
        anyhow::bail!("interface name {:?} too long", name);
    }
    let mut ifr = unsafe { MaybeUninit::<libc::ifreq>::zeroed().assume_init() };
    for (i, byte) in name.as_bytes().iter().enumerate() {
        ifr.ifr_name[i] = *byte as libc::c_char;
    }
    Ok(ifr)
}

fn ifreq_add_flags(ifr: &mut libc::ifreq, flags: &[libc::c_int]) {
    unsafe {
        ifr.ifr_ifru.ifru_flags = 0;
        for flag in flags {
            ifr.ifr_ifru.ifru_flags |= *flag as libc::c_short;
        }
    }
}

fn ifreq_ioctl(fd: libc::c_int, ifr: &mut libc::ifreq, cmd: libc::c_ulong) -> io::Result<libc::c_int> {
    let res = unsafe { libc::ioctl(fd, cmd as _, ifr as *mut libc::ifreq) };
    if res == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(res)
}

fn ip_control_socket() -> io::Result<std::fs::File> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_DGRAM, libc::IPPROTO_IP);
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(std::fs::File::from_raw_fd(fd))
    }
}

impl TunTapDevice {
    /// Attach to (creating if necessary) the named tun/tap interface and
    /// bring it up.
    pub fn new(name: &str, medium: Medium) -> anyhow::Result<TunTapDevice> {
        let fd = unsafe {
            let fd = libc::open(TUN_PATH.as_ptr(), libc::O_RDWR | libc::O_NONBLOCK);
            if fd == -1 {
                return Err(io::Error::last_os_error()).with_context(|| context!());
            }
            fd
        };

        let mut ifr = ifreq_for(name)?;
        let iff_mode = match medium {
            Medium::Layer3 => libc::IFF_TUN,
            Medium::Layer2 => libc::IFF_TAP,
        };
        ifreq_add_flags(&mut ifr, &[iff_mode, libc::IFF_NO_PI]);
        ifreq_ioctl(fd, &mut ifr, libc::TUNSETIFF).with_context(|| context!())?;

        let control = ip_control_socket().with_context(|| context!())?;
        ifr.ifr_ifru.ifru_flags = 0;
        ifreq_ioctl(control.as_raw_fd(), &mut ifr, libc::SIOCGIFFLAGS).with_context(|| context!())?;
        ifreq_add_flags(&mut ifr, &[libc::IFF_UP, libc::IFF_RUNNING]);
        ifreq_ioctl(control.as_raw_fd(), &mut ifr, libc::SIOCSIFFLAGS).with_context(|| context!())?;

        Ok(TunTapDevice { fd })
    }

    /// One `read(2)` call, yielding at most one IPv4 frame. A short read
    /// (`0` bytes) means nothing was available; the caller only reaches
    /// this after readiness says the fd is readable.
    pub fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let len = unsafe { libc::read(self.fd, buffer.as_mut_ptr() as *mut libc::c_void, buffer.len()) };
        if len == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(len as usize)
    }

    /// One `write(2)` call carrying the whole frame.
    pub fn send(&mut self, buffer: &[u8]) -> io::Result<usize> {
        let len = unsafe { libc::write(self.fd, buffer.as_ptr() as *const libc::c_void, buffer.len()) };
        if len == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(len as usize)
    }
}

impl Drop for TunTapDevice {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
