// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # daemon
//!
//! The control loop that ties the governor together.
//!
//! The daemon takes:
//! - A [`MetricsSource`](power_monitor::MetricsSource) from `power-monitor`.
//! - A [`KernelCoreController`](kernel_control::KernelCoreController) and a
//!   [`ProcessTable`](kernel_control::ProcessTable) from `kernel-control`.
//! - A [`DecisionEngine`](decision_engine::DecisionEngine) from
//!   `decision-engine`, configured from [`DaemonConfig`].
//!
//! And, once per interval, samples load, applies at most one core
//! transition, moves processes off parked cores, and reports.
//!
//! # Async Execution
//! Uses a current-thread `tokio` runtime. Cycle work is blocking (sysfs
//! writes, `/proc` scans, `perf`) and runs on the blocking pool; the loop
//! itself only sleeps and listens for shutdown.

mod config;
mod daemon;
mod error;
mod rebalance;
mod report;

pub use config::{DaemonConfig, InitMode, OutputFormat, SelectorKind};
pub use daemon::{CycleReport, Daemon};
pub use error::DaemonError;
pub use rebalance::{ProcessRebalancer, RebalanceReport};
pub use report::{take_inventory, InventoryRow, StatusReporter, StatusView};
