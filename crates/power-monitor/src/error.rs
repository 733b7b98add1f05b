// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for metric acquisition.

use std::time::Duration;

/// A metric could not be read. Callers degrade the affected field to its
/// default and carry on with the cycle.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// Failed to read a sysfs or procfs file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse a value from a system file or command output.
    #[error("failed to parse value from {path}: {detail}")]
    ParseError { path: String, detail: String },

    /// The expected sysfs/procfs path does not exist.
    #[error("path not found: {path}")]
    NotAvailable { path: String },

    /// No `/proc/interrupts` line mentions the monitored interface.
    #[error("no interrupt lines found for interface '{interface}'")]
    InterfaceNotFound { interface: String },

    /// An external sampling command could not be run or exited non-zero.
    #[error("command '{command}' failed: {detail}")]
    CommandFailed { command: String, detail: String },

    /// An external sampling command did not finish in time and was killed.
    #[error("command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}
