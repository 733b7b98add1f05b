// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `coregov run` command: the control loop.
//!
//! Prints one line per cycle (or one JSON object per line with
//! `--format json`) and the final status on exit. Stops on Ctrl-C between
//! cycles, or after `--max-cycles`.

use super::{banner, parse_seconds, SamplingArgs};
use anyhow::Context;
use clap::Args;
use daemon::{CycleReport, Daemon, DaemonConfig, InitMode, OutputFormat, SelectorKind};
use decision_engine::{Thresholds, IPC_THRESHOLD, IRQ_THRESHOLD, LOAD_THRESHOLD, MIN_ACTIVE_CORES};
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub sampling: SamplingArgs,

    /// Delay between cycles, in seconds.
    #[arg(short = 'n', long, default_value = "5", value_parser = parse_seconds)]
    pub interval: Duration,

    /// Registry seeding: all-active (bring every core online) or from-kernel.
    #[arg(long, default_value = "all-active")]
    pub init: InitMode,

    /// Core selector: least-utilized or highest-id.
    #[arg(short, long, default_value = "least-utilized")]
    pub selector: SelectorKind,

    /// Decide and log transitions without writing kernel state.
    #[arg(long)]
    pub dry_run: bool,

    /// Rebalance processes after every cycle, not only after a deactivation.
    #[arg(long)]
    pub rebalance_every_cycle: bool,

    /// Stop after this many cycles.
    #[arg(long)]
    pub max_cycles: Option<u64>,

    /// Aggregate load threshold, in percent.
    #[arg(long, default_value_t = LOAD_THRESHOLD)]
    pub load_threshold: f64,

    /// Interrupt count threshold.
    #[arg(long, default_value_t = IRQ_THRESHOLD)]
    pub irq_threshold: u64,

    /// Instructions-per-cycle threshold.
    #[arg(long, default_value_t = IPC_THRESHOLD)]
    pub ipc_threshold: f64,

    /// Cores (besides core 0) that always stay active.
    #[arg(long, default_value_t = MIN_ACTIVE_CORES)]
    pub min_active: usize,
}

impl RunArgs {
    /// Builds the daemon configuration these flags describe.
    pub fn to_config(&self) -> DaemonConfig {
        DaemonConfig {
            interval: self.interval,
            interface: self.sampling.interface.clone(),
            init: self.init,
            selector: self.selector,
            ipc: self.sampling.ipc.clone(),
            op_timeout: self.sampling.op_timeout,
            dry_run: self.dry_run,
            rebalance_every_cycle: self.rebalance_every_cycle,
            max_cycles: self.max_cycles,
            thresholds: Thresholds {
                load_percent: self.load_threshold,
                irq_count: self.irq_threshold,
                ipc: self.ipc_threshold,
                min_active: self.min_active,
            },
            format: self.sampling.format,
        }
    }
}

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let config = args.to_config();
    let format = config.format;

    if format == OutputFormat::Text {
        banner("Core Governor");
        println!("  Config:");
        println!("   Interface:  {}", config.interface);
        println!("   Interval:   {:?}", config.interval);
        println!("   Init:       {}", config.init);
        println!("   Selector:   {}", config.selector);
        println!("   IPC:        {:?}", config.ipc);
        println!(
            "   Thresholds: load {:.1}%, irq {}, ipc {:.2}, min active {}",
            config.thresholds.load_percent,
            config.thresholds.irq_count,
            config.thresholds.ipc,
            config.thresholds.min_active,
        );
        if config.dry_run {
            println!("   Mode:       DRY RUN (no kernel writes)");
        }
        println!();
    }

    // Startup failures are the only fatal errors.
    let daemon = tokio::task::spawn_blocking(move || Daemon::for_host(config))
        .await
        .context("startup worker failed")?
        .context("failed to start the governor")?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C; stop with --max-cycles or SIGTERM");
            std::future::pending::<()>().await;
        }
    };

    let daemon = daemon
        .run(shutdown, |_, report| print_cycle(format, report))
        .await?;

    if format == OutputFormat::Text {
        println!();
        println!("  Final state after {} cycles:", daemon.cycles());
        println!();
    }
    println!("{}", daemon.status());
    Ok(())
}

fn print_cycle(format: OutputFormat, report: &CycleReport) {
    match format {
        OutputFormat::Text => println!("  {}", report.summary()),
        OutputFormat::Json => match serde_json::to_string(report) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, cycle = report.cycle, "cannot serialise cycle report"),
        },
    }
}
