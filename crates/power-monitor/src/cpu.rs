// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CPU utilisation, inventory, online state and frequency.
//!
//! Reads CPU state from:
//! - `/proc/stat` — cumulative jiffies per CPU; utilisation is the busy
//!   share of the delta between two samples.
//! - `/sys/devices/system/cpu/present` — the core inventory.
//! - `/sys/devices/system/cpu/cpuN/online` — hotplug state.
//! - `/sys/devices/system/cpu/cpuN/cpufreq/scaling_cur_freq` — current
//!   frequency in kHz.
//!
//! Offline CPUs disappear from `/proc/stat` and lose their `cpufreq`
//! directory; both read as zero rather than as errors.

use crate::sysfs::{read_trimmed, read_u64};
use crate::AcquisitionError;
use core_registry::{cpulist, CoreId};
use std::collections::BTreeMap;
use std::path::Path;

/// Busy and total jiffies for one `/proc/stat` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

impl CpuTimes {
    /// Parses the numeric fields after the `cpuN` label.
    ///
    /// Field order: user nice system idle iowait irq softirq steal guest
    /// guest_nice. Idle and iowait count as not busy; guest time is
    /// already included in user/nice and is skipped.
    fn parse(fields: &[u64]) -> Option<Self> {
        if fields.len() < 4 {
            return None;
        }
        let total: u64 = fields.iter().take(8).sum();
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        Some(Self {
            busy: total.saturating_sub(idle),
            total,
        })
    }

    /// Busy percentage of the interval between `earlier` and `self`.
    pub fn utilisation_since(&self, earlier: &CpuTimes) -> f64 {
        let total = self.total.saturating_sub(earlier.total);
        if total == 0 {
            return 0.0;
        }
        let busy = self.busy.saturating_sub(earlier.busy);
        (busy as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// One reading of `/proc/stat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StatSample {
    pub aggregate: CpuTimes,
    pub per_core: BTreeMap<CoreId, CpuTimes>,
}

/// Utilisation derived from two consecutive [`StatSample`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Utilisation {
    pub aggregate_percent: f64,
    pub per_core_percent: BTreeMap<CoreId, f64>,
}

impl StatSample {
    /// Reads and parses `stat` under the given procfs root.
    pub fn read(proc_root: &Path) -> Result<Self, AcquisitionError> {
        let path = proc_root.join("stat");
        let content = read_trimmed(&path)?;
        Self::parse(&content).ok_or_else(|| AcquisitionError::ParseError {
            path: path.display().to_string(),
            detail: "no aggregate 'cpu' line".to_string(),
        })
    }

    /// Parses `/proc/stat` content. Returns `None` without an aggregate line.
    pub fn parse(content: &str) -> Option<Self> {
        let mut aggregate = None;
        let mut per_core = BTreeMap::new();

        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let Some(label) = parts.next() else { continue };
            if !label.starts_with("cpu") {
                continue;
            }
            let fields: Vec<u64> = parts.filter_map(|s| s.parse().ok()).collect();
            let Some(times) = CpuTimes::parse(&fields) else {
                continue;
            };
            match label[3..].parse::<u32>() {
                Ok(index) => {
                    per_core.insert(CoreId::new(index), times);
                }
                Err(_) if label == "cpu" => aggregate = Some(times),
                Err(_) => {}
            }
        }

        aggregate.map(|aggregate| Self {
            aggregate,
            per_core,
        })
    }

    /// Computes utilisation over the interval since `earlier`.
    ///
    /// Cores missing from either sample (offline for part of the interval)
    /// report 0 %.
    pub fn utilisation_since(&self, earlier: &StatSample) -> Utilisation {
        let per_core_percent = self
            .per_core
            .iter()
            .map(|(core, now)| {
                let pct = earlier
                    .per_core
                    .get(core)
                    .map(|before| now.utilisation_since(before))
                    .unwrap_or(0.0);
                (*core, pct)
            })
            .collect();
        Utilisation {
            aggregate_percent: self.aggregate.utilisation_since(&earlier.aggregate),
            per_core_percent,
        }
    }
}

/// Determines the number of logical CPUs (`max index + 1`).
///
/// Tries `present` first (e.g., `"0-7"` → 8), then falls back to the
/// highest `cpuN` directory, and finally to
/// `std::thread::available_parallelism()`.
pub fn discover_max_cores(cpu_root: &Path) -> Result<u32, AcquisitionError> {
    for name in ["present", "possible"] {
        if let Ok(content) = read_trimmed(&cpu_root.join(name)) {
            if let Some(max) = cpulist::parse(&content).and_then(|s| s.last().copied()) {
                return Ok(max.index() + 1);
            }
        }
    }

    // Fallback: highest cpu directory.
    if let Ok(entries) = std::fs::read_dir(cpu_root) {
        let max = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                name.strip_prefix("cpu")?.parse::<u32>().ok()
            })
            .max();
        if let Some(max) = max {
            return Ok(max + 1);
        }
    }

    // Last resort: available_parallelism.
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .map_err(|e| AcquisitionError::ReadError {
            path: cpu_root.display().to_string(),
            source: e,
        })
}

/// Reads a core's hotplug state.
///
/// A missing `online` file means the core cannot be hot-unplugged and is
/// therefore online.
pub fn read_core_online(cpu_root: &Path, core: CoreId) -> Result<bool, AcquisitionError> {
    let path = cpu_root.join(core.sysfs_name()).join("online");
    match read_trimmed(&path) {
        Ok(value) => match value.as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(AcquisitionError::ParseError {
                path: path.display().to_string(),
                detail: format!("expected '0' or '1', got '{other}'"),
            }),
        },
        Err(AcquisitionError::NotAvailable { .. }) if cpu_root.join(core.sysfs_name()).is_dir() => {
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

/// Reads a core's current frequency in kHz.
pub fn read_core_frequency_khz(cpu_root: &Path, core: CoreId) -> Result<u64, AcquisitionError> {
    let path = cpu_root
        .join(core.sysfs_name())
        .join("cpufreq")
        .join("scaling_cur_freq");
    read_u64(&path)
}
