// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # power-monitor
//!
//! Reads the load signals the governor acts on from `/proc` and `/sys`.
//!
//! # Monitored Metrics
//! - **Aggregate CPU load** — busy share of `/proc/stat` jiffies between
//!   two samples.
//! - **Interrupt volume** — cumulative `/proc/interrupts` counts for one
//!   network interface (an I/O-load proxy).
//! - **IPC** — instructions per cycle, either a fixed estimate or a
//!   `perf stat` sample.
//! - **Per-core state** — utilisation, hotplug state and current frequency
//!   of every managed core.
//!
//! # Graceful Degradation
//! Every reader returns `Result<_, AcquisitionError>`, but
//! [`MetricsSource::capture`] never fails: a field whose read fails is
//! logged and replaced by its default (`0`, `0.0`, or an empty map), so the
//! control loop always gets a snapshot.
//!
//! # Example
//! ```no_run
//! use power_monitor::{IpcEstimator, MetricsSource, ProcfsSource};
//!
//! let cores = power_monitor::discover_max_cores().unwrap_or(1);
//! let mut source = ProcfsSource::new(cores, IpcEstimator::default());
//! let snap = source.capture("eno1");
//! println!("{}", snap.summary());
//! ```

mod cpu;
mod error;
mod interrupts;
mod ipc;
mod snapshot;
mod source;
mod sysfs;

pub use cpu::{read_core_frequency_khz, read_core_online};
pub use error::AcquisitionError;
pub use interrupts::read_irq_count;
pub use ipc::{IpcEstimator, DEFAULT_IPC_ESTIMATE};
pub use snapshot::{CoreSample, MetricsSnapshot};
pub use source::{MetricsSource, ProcfsSource};
pub use sysfs::{CPU_SYSFS_ROOT, PROC_ROOT};

/// Discovers the number of logical CPUs on this host.
///
/// This is a convenience wrapper around reading
/// `/sys/devices/system/cpu/present`.
pub fn discover_max_cores() -> Result<u32, AcquisitionError> {
    cpu::discover_max_cores(std::path::Path::new(CPU_SYSFS_ROOT))
}
