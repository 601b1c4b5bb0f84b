//! The external collaborators the core scheduler is handed already-open
//! handles to: the tap/tun device and the TCP socket, plus the
//! `select`-based readiness primitive that drives both.

pub mod readiness;
pub mod sock;
pub mod tap;

pub use readiness::SelectReadiness;
pub use sock::{Frame, SockDevice};
pub use tap::TunTapDevice;
