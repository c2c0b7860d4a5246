//! Supervise a command with the inactivity watchdog.
//!
//! ```text
//! cargo run --example supervise -- --timeout 10 --stderr "ffmpeg -i in.ts -f null -"
//! ```

use anyhow::Result;
use clap::Parser;
use cmdline_core::{OutputStream, ProcessHandle, WatchdogConfig};
use std::io::Write;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "supervise")]
#[command(about = "Run a command and kill it when its output stalls")]
struct Args {
    /// Seconds without output before the command is killed
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Watch stderr instead of stdout
    #[arg(long)]
    stderr: bool,

    /// Treat carriage returns as the chunk delimiter (progress meters)
    #[arg(long)]
    carriage_return: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Command line to run (whitespace-delimited, no quoting)
    command: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let handle = ProcessHandle::new(&args.command)?;
    let stream = if args.stderr {
        OutputStream::Stderr
    } else {
        OutputStream::Stdout
    };
    let delimiter = if args.carriage_return {
        b'\r'
    } else {
        WatchdogConfig::DEFAULT_DELIMITER
    };

    info!("Supervising {} on {}", handle.command_line(), stream);

    let mut out = std::io::stdout().lock();
    let report = handle.run_with_inactivity_timeout_observed(
        Duration::from_secs(args.timeout),
        delimiter,
        stream,
        |chunk| {
            let _ = out.write_all(chunk);
            let _ = out.flush();
        },
    )?;

    if report.killed_by_watchdog {
        info!("Killed after {}s without output", args.timeout);
    }
    match report.status {
        Some(status) => info!("{} chunks, {}", report.chunks, status),
        None => info!("{} chunks, reaped elsewhere", report.chunks),
    }

    Ok(())
}
