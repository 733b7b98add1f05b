// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Aggregated point-in-time metrics snapshot.
//!
//! A [`MetricsSnapshot`] is the single input the decision engine consumes
//! each cycle. It is built once, never mutated, and every field has a
//! documented default that stands in when acquisition fails.

use core_registry::CoreId;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-core reading for one managed core.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CoreSample {
    /// Busy share of the last sampling interval, `0.0..=100.0`.
    /// Defaults to `0.0`.
    pub utilization_percent: f64,
    /// Kernel hotplug state. Defaults to `false` when unreadable.
    pub online: bool,
    /// Current frequency in kHz. `0` when offline or unreadable.
    pub frequency_khz: u64,
}

/// One cycle's worth of load signals.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Aggregate CPU utilisation in percent. Defaults to `0.0`.
    pub cpu_load_percent: f64,
    /// Cumulative interrupt count for the monitored interface. Defaults to `0`.
    pub irq_count: u64,
    /// Instructions-per-cycle estimate. Defaults to `0.0`.
    pub ipc: f64,
    /// Readings for the managed cores (core 0 omitted). Empty when the
    /// per-core read failed outright.
    pub per_core: BTreeMap<CoreId, CoreSample>,
    /// Unix timestamp in milliseconds when the snapshot was taken.
    pub timestamp_ms: u64,
}

impl MetricsSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(
        cpu_load_percent: f64,
        irq_count: u64,
        ipc: f64,
        per_core: BTreeMap<CoreId, CoreSample>,
    ) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            cpu_load_percent,
            irq_count,
            ipc,
            per_core,
            timestamp_ms,
        }
    }

    /// Returns the reading for `core`, if one was taken.
    pub fn core(&self, core: CoreId) -> Option<&CoreSample> {
        self.per_core.get(&core)
    }

    /// Utilisation of `core`, or `None` without a reading.
    pub fn utilization_of(&self, core: CoreId) -> Option<f64> {
        self.core(core).map(|s| s.utilization_percent)
    }

    /// Managed cores the kernel reported online, ascending.
    pub fn online_cores(&self) -> impl Iterator<Item = CoreId> + '_ {
        self.per_core
            .iter()
            .filter(|(_, s)| s.online)
            .map(|(core, _)| *core)
    }

    /// Returns a one-line summary suitable for logging.
    ///
    /// # Example output
    /// ```text
    /// Load 7.3%, IRQ 1204 (eno1 total), IPC 0.42, 3/7 managed cores online
    /// ```
    pub fn summary(&self) -> String {
        format!(
            "Load {:.1}%, IRQ {}, IPC {:.2}, {}/{} managed cores online",
            self.cpu_load_percent,
            self.irq_count,
            self.ipc,
            self.online_cores().count(),
            self.per_core.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(util: f64, online: bool) -> CoreSample {
        CoreSample {
            utilization_percent: util,
            online,
            frequency_khz: if online { 1_800_000 } else { 0 },
        }
    }

    fn snapshot() -> MetricsSnapshot {
        let mut per_core = BTreeMap::new();
        per_core.insert(CoreId::new(1), sample(12.5, true));
        per_core.insert(CoreId::new(2), sample(0.0, false));
        per_core.insert(CoreId::new(3), sample(40.0, true));
        MetricsSnapshot::new(7.25, 1204, 0.42, per_core)
    }

    #[test]
    fn test_online_cores() {
        let s = snapshot();
        let online: Vec<_> = s.online_cores().collect();
        assert_eq!(online, vec![CoreId::new(1), CoreId::new(3)]);
    }

    #[test]
    fn test_utilization_of() {
        let s = snapshot();
        assert_eq!(s.utilization_of(CoreId::new(3)), Some(40.0));
        assert_eq!(s.utilization_of(CoreId::new(7)), None);
    }

    #[test]
    fn test_summary_format() {
        let summary = snapshot().summary();
        assert!(summary.contains("Load 7.2%") || summary.contains("Load 7.3%"));
        assert!(summary.contains("IRQ 1204"));
        assert!(summary.contains("IPC 0.42"));
        assert!(summary.contains("2/3 managed cores online"));
    }

    #[test]
    fn test_timestamp_set() {
        assert!(snapshot().timestamp_ms > 0);
    }

    #[test]
    fn test_serialises_to_json() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["irq_count"], 1204);
        assert_eq!(json["per_core"]["3"]["online"], true);
    }
}
