// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Human- and machine-readable status output.
//!
//! The reporter is a read-only projection of the last snapshot, the
//! registry and the current governor. It never fails: missing pieces
//! render as `n/a` (text) or `null` (JSON).

use crate::OutputFormat;
use core_registry::{cpulist, CoreId, CoreStateRegistry, RegistrySnapshot};
use kernel_control::{Governor, KernelCoreController};
use power_monitor::{CoreSample, MetricsSnapshot};
use std::fmt::Write as _;
use std::path::Path;

/// Everything a status rendering shows.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusView<'a> {
    pub snapshot: Option<&'a MetricsSnapshot>,
    pub registry: RegistrySnapshot,
    pub governor: Option<Governor>,
}

/// One row of the core inventory.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InventoryRow {
    pub core: CoreId,
    pub online: Option<bool>,
    pub governor: Option<Governor>,
    pub frequency_khz: Option<u64>,
}

/// Reads online state, governor and frequency for cores `0..max_cores`.
///
/// Unreadable attributes are `None`; the inventory itself never fails.
pub fn take_inventory(
    controller: &dyn KernelCoreController,
    cpu_root: &Path,
    max_cores: u32,
) -> Vec<InventoryRow> {
    (0..max_cores)
        .map(CoreId::new)
        .map(|core| {
            let online = controller.is_online(core).ok();
            let governor = if online == Some(true) {
                controller.current_governor(core).ok()
            } else {
                None
            };
            let frequency_khz = if online == Some(true) {
                power_monitor::read_core_frequency_khz(cpu_root, core).ok()
            } else {
                None
            };
            InventoryRow {
                core,
                online,
                governor,
                frequency_khz,
            }
        })
        .collect()
}

/// Renders status in the configured format.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusReporter {
    format: OutputFormat,
}

impl StatusReporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Renders the current state.
    pub fn render(
        &self,
        snapshot: Option<&MetricsSnapshot>,
        registry: &CoreStateRegistry,
        governor: Option<Governor>,
    ) -> String {
        let view = StatusView {
            snapshot,
            registry: registry.snapshot(),
            governor,
        };
        match self.format {
            OutputFormat::Text => render_text(&view),
            OutputFormat::Json => to_json(&view),
        }
    }

    /// Renders a core inventory.
    pub fn render_inventory(&self, rows: &[InventoryRow]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&rows),
            OutputFormat::Text => {
                let mut out = String::new();
                let _ = writeln!(
                    out,
                    "  {:<6} {:<8} {:<14} {:>10}",
                    "Core", "State", "Governor", "Freq (MHz)"
                );
                let _ = writeln!(out, "  {}", "-".repeat(41));
                for row in rows {
                    let state = match row.online {
                        Some(true) => "online",
                        Some(false) => "offline",
                        None => "n/a",
                    };
                    let core = if row.core.is_reserved() {
                        format!("{}*", row.core)
                    } else {
                        row.core.to_string()
                    };
                    let _ = writeln!(
                        out,
                        "  {:<6} {:<8} {:<14} {:>10}",
                        core,
                        state,
                        row.governor.map_or("n/a", |g| g.as_str()),
                        mhz(row.frequency_khz),
                    );
                }
                let _ = writeln!(out, "  * reserved, never taken offline");
                out
            }
        }
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"cannot serialise status: {e}\"}}"))
}

fn mhz(khz: Option<u64>) -> String {
    match khz {
        Some(k) if k > 0 => format!("{}", k / 1000),
        _ => "n/a".to_string(),
    }
}

fn list_or_none(cores: &[CoreId]) -> String {
    if cores.is_empty() {
        "none".to_string()
    } else {
        cpulist::format(cores)
    }
}

fn render_text(view: &StatusView<'_>) -> String {
    let mut out = String::new();

    // ── Metrics ────────────────────────────────────────────────
    let _ = writeln!(out, "  Metrics");
    match view.snapshot {
        Some(s) => {
            let _ = writeln!(out, "   CPU load:     {:>8.1} %  {}", s.cpu_load_percent, usage_bar(s.cpu_load_percent / 100.0));
            let _ = writeln!(out, "   IRQ count:    {:>8}", s.irq_count);
            let _ = writeln!(out, "   IPC:          {:>8.2}", s.ipc);
        }
        None => {
            let _ = writeln!(out, "   n/a (no cycle has run yet)");
        }
    }
    let _ = writeln!(
        out,
        "   Governor:     {:>8}",
        view.governor.map_or("n/a", |g| g.as_str())
    );
    let _ = writeln!(out);

    // ── Per-Core ───────────────────────────────────────────────
    let _ = writeln!(out, "  Cores");
    let _ = writeln!(
        out,
        "  {:<6} {:>8} {:<22} {:<8} {:>10}",
        "Core", "Usage", "", "State", "Freq (MHz)"
    );
    let _ = writeln!(out, "  {}", "-".repeat(58));
    let empty = std::collections::BTreeMap::new();
    let per_core = view.snapshot.map_or(&empty, |s| &s.per_core);
    if per_core.is_empty() {
        let _ = writeln!(out, "   no per-core readings");
    }
    for (core, sample) in per_core {
        let _ = writeln!(out, "{}", core_line(*core, sample));
    }
    let _ = writeln!(out);

    // ── Registry ───────────────────────────────────────────────
    let _ = writeln!(out, "  Registry");
    let _ = writeln!(
        out,
        "   Active:       {} ({})",
        list_or_none(&view.registry.active),
        view.registry.active.len()
    );
    let _ = writeln!(
        out,
        "   Offline:      {} ({})",
        list_or_none(&view.registry.offline),
        view.registry.offline.len()
    );
    out
}

fn core_line(core: CoreId, sample: &CoreSample) -> String {
    format!(
        "  {:<6} {:>7.1}% {:<22} {:<8} {:>10}",
        core.to_string(),
        sample.utilization_percent,
        usage_bar(sample.utilization_percent / 100.0),
        if sample.online { "online" } else { "offline" },
        mhz(Some(sample.frequency_khz)),
    )
}

/// Creates a visual usage bar (0.0-1.0 scale).
fn usage_bar(ratio: f64) -> String {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let filled = (ratio * 20.0).round() as usize;
    let empty = 20 - filled;
    let symbol = if ratio >= 0.9 {
        "#"
    } else if ratio >= 0.7 {
        "="
    } else {
        "-"
    };
    format!("[{}{}]", symbol.repeat(filled), ".".repeat(empty))
}
