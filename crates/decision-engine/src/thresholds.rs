// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Policy thresholds and the precedence table.
//!
//! ```text
//! load < LOAD ∧ irq < IRQ ∧ ipc < IPC ∧ |active| > MIN   → ScaleDown
//! (load ≥ LOAD ∨ irq ≥ IRQ ∨ ipc ≥ IPC) ∧ offline ≠ ∅     → ScaleUp
//! otherwise                                               → Hold
//! ```
//!
//! The first matching row wins. Any signal at or above its threshold is
//! busy, `+inf` included. NaN is never busy, and a non-finite load or IPC
//! is never quiet, so a reading that failed to parse cannot shed a core.

use crate::DecisionError;
use power_monitor::MetricsSnapshot;

/// Aggregate CPU load (percent) below which the system counts as quiet.
pub const LOAD_THRESHOLD: f64 = 10.0;

/// Interrupt count below which network I/O counts as quiet.
pub const IRQ_THRESHOLD: u64 = 100_000;

/// IPC below which the workload counts as stalled rather than compute-bound.
pub const IPC_THRESHOLD: f64 = 0.7;

/// Cores that always stay active (core 0 not counted).
pub const MIN_ACTIVE_CORES: usize = 1;

/// The threshold set a [`crate::DecisionEngine`] evaluates against.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Thresholds {
    pub load_percent: f64,
    pub irq_count: u64,
    pub ipc: f64,
    pub min_active: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            load_percent: LOAD_THRESHOLD,
            irq_count: IRQ_THRESHOLD,
            ipc: IPC_THRESHOLD,
            min_active: MIN_ACTIVE_CORES,
        }
    }
}

/// The three signals the policy looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signals {
    pub load_percent: f64,
    pub irq_count: u64,
    pub ipc: f64,
}

impl From<&MetricsSnapshot> for Signals {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            load_percent: snapshot.cpu_load_percent,
            irq_count: snapshot.irq_count,
            ipc: snapshot.ipc,
        }
    }
}

/// Which row of the precedence table matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    ScaleDown,
    ScaleUp,
    Hold,
}

impl Thresholds {
    /// Rejects thresholds the policy cannot evaluate.
    pub fn validate(&self) -> Result<(), DecisionError> {
        if !self.load_percent.is_finite() || self.load_percent < 0.0 {
            return Err(DecisionError::InvalidThresholds(format!(
                "load threshold must be a non-negative number, got {}",
                self.load_percent
            )));
        }
        if !self.ipc.is_finite() || self.ipc < 0.0 {
            return Err(DecisionError::InvalidThresholds(format!(
                "ipc threshold must be a non-negative number, got {}",
                self.ipc
            )));
        }
        if self.min_active == 0 {
            return Err(DecisionError::InvalidThresholds(
                "at least one core must stay active".to_string(),
            ));
        }
        Ok(())
    }

    /// Evaluates the precedence table. Pure: no I/O, no state.
    pub fn evaluate(&self, signals: Signals, active: usize, offline: usize) -> Verdict {
        let busy = signals.load_percent >= self.load_percent
            || signals.irq_count >= self.irq_count
            || signals.ipc >= self.ipc;
        let quiet = signals.load_percent.is_finite()
            && signals.ipc.is_finite()
            && signals.load_percent < self.load_percent
            && signals.irq_count < self.irq_count
            && signals.ipc < self.ipc;

        if quiet && active > self.min_active {
            Verdict::ScaleDown
        } else if busy && offline > 0 {
            Verdict::ScaleUp
        } else {
            Verdict::Hold
        }
    }
}
