// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `coregov status` command: one-shot snapshot of load and core state.
//!
//! Read-only. The registry view is derived from the kernel's current
//! online flags, so this works whether or not a governor is running. On
//! hosts without the monitored interface or without cpufreq, the affected
//! readings show defaults and the command still works.

use super::{banner, SamplingArgs};
use anyhow::Context;
use core_registry::{CoreId, CoreStateRegistry};
use daemon::{OutputFormat, StatusReporter};
use kernel_control::{Bounded, KernelCoreController, SysfsController};
use power_monitor::{MetricsSource, ProcfsSource};

pub async fn execute(args: SamplingArgs) -> anyhow::Result<()> {
    let max_cores = power_monitor::discover_max_cores().context("cannot discover cores")?;

    // The first utilisation reading waits one sampling interval.
    let source_args = args.clone();
    let snapshot = tokio::task::spawn_blocking(move || {
        ProcfsSource::new(max_cores, source_args.ipc)
            .command_timeout(source_args.op_timeout)
            .capture(&source_args.interface)
    })
    .await
    .context("sampling worker failed")?;

    let registry = CoreStateRegistry::from_online(max_cores, 0, snapshot.online_cores())
        .context("inconsistent core inventory")?;
    let controller = Bounded::new(SysfsController::new(max_cores), args.op_timeout);
    let governor = controller.current_governor(CoreId::RESERVED).ok();

    if args.format == OutputFormat::Text {
        banner("System Status");
        println!("  Host: {max_cores} logical CPUs, interface {}", args.interface);
        println!();
    }
    let reporter = StatusReporter::new(args.format);
    println!("{}", reporter.render(Some(&snapshot), &registry, governor));

    if args.format == OutputFormat::Text {
        println!("{}", snapshot.summary());
    }
    Ok(())
}
