#[macro_use]
mod macros; // must precede every other `mod` that uses `context!()`

pub mod config;
pub mod device;
pub mod pacing;
pub mod packet;
pub mod queue;
pub mod spoof;
pub mod time;
pub mod tunnel;
pub mod wire;
