// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Moving processes off cores that were taken offline.
//!
//! The kernel migrates runnable tasks when a core goes down, but a task
//! whose affinity mask contains *only* offline cores keeps that mask and
//! is forced onto whatever the kernel picks. The rebalancer finds such
//! processes and pins them to one verified-online active core.

use core_registry::{CoreId, CoreStateRegistry};
use kernel_control::{AffinityError, KernelCoreController, ProcessTable};
use std::collections::BTreeSet;

/// Result of one rebalancing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RebalanceReport {
    /// Processes examined.
    pub scanned: usize,
    /// Processes whose affinity was changed, ascending by pid.
    pub reassigned: Vec<i32>,
    /// Processes that exited during the pass.
    pub vanished: usize,
    /// Processes the daemon may not modify.
    pub denied: usize,
    /// Processes skipped for any other error.
    pub failed: usize,
    /// Core processes were moved to. `None` if no active core verified
    /// online, in which case nothing was attempted.
    pub target: Option<CoreId>,
}

impl RebalanceReport {
    fn record_error(&mut self, pid: i32, error: &AffinityError) {
        match error {
            AffinityError::Vanished { .. } => {
                tracing::debug!(pid, "process exited during rebalance");
                self.vanished += 1;
            }
            AffinityError::PermissionDenied { .. } => {
                tracing::warn!(pid, "not permitted to change process affinity, skipped");
                self.denied += 1;
            }
            other => {
                tracing::warn!(pid, error = %other, "cannot rebalance process, skipped");
                self.failed += 1;
            }
        }
    }

    /// Returns a one-line summary suitable for logging.
    pub fn summary(&self) -> String {
        let target = self
            .target
            .map_or_else(|| "none".to_string(), |c| c.to_string());
        format!(
            "Rebalance: {} scanned, {} moved to core {target}, {} vanished, {} denied, {} failed",
            self.scanned,
            self.reassigned.len(),
            self.vanished,
            self.denied,
            self.failed,
        )
    }
}

/// Reassigns processes confined to offline cores.
#[derive(Debug, Clone, Default)]
pub struct ProcessRebalancer;

impl ProcessRebalancer {
    pub fn new() -> Self {
        Self
    }

    /// Picks the first active core the kernel confirms is online.
    pub fn pick_target(
        &self,
        registry: &CoreStateRegistry,
        controller: &dyn KernelCoreController,
    ) -> Option<CoreId> {
        registry.active().iter().copied().find(|&core| {
            match controller.is_online(core) {
                Ok(true) => true,
                Ok(false) => {
                    tracing::warn!(core = %core, "active core reported offline by the kernel");
                    false
                }
                Err(e) => {
                    tracing::warn!(core = %core, error = %e, "cannot verify core state");
                    false
                }
            }
        })
    }

    /// Runs one pass over the process table.
    pub fn rebalance(
        &self,
        table: &dyn ProcessTable,
        controller: &dyn KernelCoreController,
        registry: &CoreStateRegistry,
    ) -> RebalanceReport {
        let mut report = RebalanceReport::default();
        if registry.offline().is_empty() {
            return report;
        }

        let Some(target) = self.pick_target(registry, controller) else {
            tracing::warn!("no active core verified online, rebalance skipped");
            return report;
        };
        report.target = Some(target);

        let processes = match table.list_processes() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "cannot enumerate processes, rebalance skipped");
                return report;
            }
        };

        let pinned_to = BTreeSet::from([target]);
        for process in processes {
            report.scanned += 1;
            // Per-CPU kernel threads are parked by the kernel itself.
            if process.kernel_thread {
                continue;
            }

            let allowed = match table.affinity(process.pid) {
                Ok(set) => set,
                Err(e) => {
                    report.record_error(process.pid, &e);
                    continue;
                }
            };
            if allowed.is_empty() || !allowed.is_subset(registry.offline()) {
                continue;
            }

            match table.set_affinity(process.pid, &pinned_to) {
                Ok(()) => {
                    tracing::info!(
                        pid = process.pid,
                        name = %process.name,
                        from = ?process.last_core,
                        core = %target,
                        "process reassigned"
                    );
                    report.reassigned.push(process.pid);
                }
                Err(e) => report.record_error(process.pid, &e),
            }
        }

        tracing::info!("{}", report.summary());
        report
    }
}
