// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for privileged kernel writes.

use crate::GovernorScope;
use core_registry::CoreId;
use power_monitor::AcquisitionError;
use std::time::Duration;

/// A privileged state change was rejected or could not be confirmed.
///
/// The caller must not commit the corresponding registry mutation.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Writing a sysfs attribute failed (EACCES, EBUSY, EINVAL, …).
    #[error("failed to write '{value}' to {path}: {source}")]
    Io {
        path: String,
        value: String,
        source: std::io::Error,
    },

    /// Core 0 is never hot-plugged.
    #[error("refusing to change online state of reserved core {core}")]
    ReservedCore { core: CoreId },

    /// No core in the scope exposes a `cpufreq` directory.
    #[error("no cpufreq-capable core in scope {scope}")]
    NoCpufreq { scope: GovernorScope },

    /// The governor name read back from sysfs is not one we know.
    #[error("unknown governor '{value}' reported by {path}")]
    UnknownGovernor { path: String, value: String },

    /// Re-reading a core's state failed.
    #[error("cannot verify state of core {core}: {source}")]
    Verify {
        core: CoreId,
        #[source]
        source: AcquisitionError,
    },

    /// The operation did not complete within its deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    /// The worker running the operation could not be started or died.
    #[error("{operation} worker failed: {detail}")]
    Worker { operation: String, detail: String },
}

/// A single process could not be inspected or re-pinned.
///
/// The rebalancer skips the process and continues with the rest.
#[derive(Debug, thiserror::Error)]
pub enum AffinityError {
    /// The process exited between enumeration and reassignment.
    #[error("process {pid} no longer exists")]
    Vanished { pid: i32 },

    /// The caller lacks permission to change this process.
    #[error("permission denied for process {pid}")]
    PermissionDenied { pid: i32 },

    /// The requested core set was empty or out of range.
    #[error("invalid core set for process {pid}: {detail}")]
    InvalidCoreSet { pid: i32, detail: String },

    /// Reading procfs failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A procfs file did not have the expected shape.
    #[error("failed to parse {path}: {detail}")]
    Parse { path: String, detail: String },

    /// `sched_setaffinity(2)` failed for another reason.
    #[error("sched_setaffinity failed for process {pid}: {source}")]
    Os { pid: i32, source: std::io::Error },
}
