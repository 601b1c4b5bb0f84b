//! CLI entry point, matching `examples/original_source/simpletun_advanced.c`'s
//! `main`: parse flags, attach the tap device, establish the TCP
//! connection, then run the event loop.

use std::process::ExitCode;

use congtun::config::{self, ParseOutcome};
use congtun::tunnel::Tunnel;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let progname = args.first().cloned().unwrap_or_else(|| "congtun".to_string());

    let config = match config::parse(&progname, &args[1..]) {
        ParseOutcome::Usage(text) => {
            eprintln!("{text}");
            return ExitCode::from(1);
        }
        ParseOutcome::Run(config) => config,
    };

    let default_level = if config.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut tunnel = match Tunnel::establish(&config) {
        Ok(tunnel) => tunnel,
        Err(e) => {
            eprintln!("error connecting to tunnel interface {}: {e:#}", config.if_name);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = tunnel.run() {
        eprintln!("tunnel error: {e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
