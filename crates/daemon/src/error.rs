// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the daemon.

/// Conditions that stop the daemon.
///
/// Everything that can go wrong inside a cycle is logged and absorbed; only
/// startup problems and a crashed cycle worker surface here.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// The number of CPUs could not be determined.
    #[error("cannot discover cores: {0}")]
    Discovery(#[from] power_monitor::AcquisitionError),

    /// The initial inventory violates the registry invariants
    /// (typically: fewer online cores than `min_active`).
    #[error("cannot initialise core registry: {0}")]
    Registry(#[from] core_registry::InvariantViolation),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The blocking worker running a cycle panicked or was cancelled.
    #[error("control loop worker failed: {0}")]
    Worker(String),
}
