// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `coregov inspect` command: core inventory.
//!
//! Lists every logical CPU with its hotplug state, scaling governor and
//! current frequency, followed by a summary of what the governor would
//! manage.

use super::banner;
use anyhow::Context;
use core_registry::{cpulist, CoreId};
use daemon::{take_inventory, OutputFormat, StatusReporter};
use kernel_control::{Bounded, SysfsController};
use power_monitor::CPU_SYSFS_ROOT;
use std::path::Path;
use std::time::Duration;

const INSPECT_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn execute(format: OutputFormat) -> anyhow::Result<()> {
    let max_cores = power_monitor::discover_max_cores().context("cannot discover cores")?;
    let controller = Bounded::new(SysfsController::new(max_cores), INSPECT_TIMEOUT);
    let rows = take_inventory(&controller, Path::new(CPU_SYSFS_ROOT), max_cores);

    let reporter = StatusReporter::new(format);
    if format == OutputFormat::Json {
        println!("{}", reporter.render_inventory(&rows));
        return Ok(());
    }

    banner("Core Inventory");

    // ── Summary ────────────────────────────────────────────────
    let online: Vec<CoreId> = rows
        .iter()
        .filter(|r| r.online == Some(true))
        .map(|r| r.core)
        .collect();
    let managed = max_cores.saturating_sub(1);
    println!("  Logical CPUs:  {max_cores}");
    println!("  Online:        {} ({})", cpulist::format(&online), online.len());
    println!("  Managed:       {managed} (core 0 is reserved)");
    println!();

    // ── Per-Core Detail ────────────────────────────────────────
    print!("{}", reporter.render_inventory(&rows));
    println!();
    Ok(())
}
