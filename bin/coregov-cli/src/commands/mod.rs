// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared argument groups.

pub mod inspect;
pub mod run;
pub mod status;

use clap::Args;
use daemon::OutputFormat;
use power_monitor::IpcEstimator;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-v` raises the level from `warn`
/// through `info` and `debug` to `trace`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Options shared by every command that samples metrics.
#[derive(Args, Debug, Clone)]
pub struct SamplingArgs {
    /// Network interface whose interrupts are counted.
    #[arg(short, long, default_value = "eno1")]
    pub interface: String,

    /// IPC source: "fixed:<value>" or "perf:<seconds>".
    #[arg(long, default_value = "fixed:0.75", value_parser = IpcEstimator::parse)]
    pub ipc: IpcEstimator,

    /// Upper bound on each kernel write or sampling command, in seconds.
    #[arg(long, default_value = "2", value_parser = parse_seconds)]
    pub op_timeout: Duration,

    /// Output format: text or json.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

/// Parses a positive number of seconds (fractions allowed).
pub fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid number of seconds '{s}'"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("duration must be positive, got '{s}'"));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Prints the boxed banner used at the top of text output.
pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║{:^54}║", format!("coregov · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("5").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_seconds("0.5").unwrap(), Duration::from_millis(500));
        assert!(parse_seconds("0").is_err());
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
    }
}
