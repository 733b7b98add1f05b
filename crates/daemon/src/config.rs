// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Daemon configuration, built from command-line flags or programmatically.
//!
//! Thresholds default to the constants in [`decision_engine::thresholds`];
//! overrides apply to a single run and are never persisted.

use crate::DaemonError;
use decision_engine::{CoreSelector, HighestId, LeastUtilized, Thresholds};
use power_monitor::IpcEstimator;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the registry is seeded at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitMode {
    /// Bring every managed core online, then track them all as active.
    #[default]
    AllActive,
    /// Adopt whatever the kernel currently reports.
    FromKernel,
}

/// Which [`CoreSelector`] the decision engine uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorKind {
    #[default]
    LeastUtilized,
    HighestId,
}

/// Rendering of status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl SelectorKind {
    /// Creates the selector this kind names.
    pub fn create(self) -> Box<dyn CoreSelector> {
        match self {
            Self::LeastUtilized => Box::new(LeastUtilized::new()),
            Self::HighestId => Box::new(HighestId::new()),
        }
    }
}

impl FromStr for InitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all-active" | "all" => Ok(Self::AllActive),
            "from-kernel" | "kernel" => Ok(Self::FromKernel),
            other => Err(format!(
                "unknown init mode '{other}'; expected 'all-active' or 'from-kernel'"
            )),
        }
    }
}

impl FromStr for SelectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "least-utilized" | "least-utilised" | "least" => Ok(Self::LeastUtilized),
            "highest-id" | "highest" => Ok(Self::HighestId),
            other => Err(format!(
                "unknown selector '{other}'; expected 'least-utilized' or 'highest-id'"
            )),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}'; expected 'text' or 'json'")),
        }
    }
}

impl fmt::Display for InitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AllActive => "all-active",
            Self::FromKernel => "from-kernel",
        })
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LeastUtilized => "least-utilized",
            Self::HighestId => "highest-id",
        })
    }
}

/// Configuration for the control loop.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DaemonConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Network interface whose interrupts are counted.
    pub interface: String,
    pub init: InitMode,
    pub selector: SelectorKind,
    pub ipc: IpcEstimator,
    /// Upper bound on any single kernel write or sampling command.
    pub op_timeout: Duration,
    /// Decide and log, but never write kernel state.
    pub dry_run: bool,
    /// Rebalance after every cycle instead of only after a deactivation.
    pub rebalance_every_cycle: bool,
    /// Stop after this many cycles (`None` runs until interrupted).
    pub max_cycles: Option<u64>,
    pub thresholds: Thresholds,
    pub format: OutputFormat,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            interface: "eno1".to_string(),
            init: InitMode::default(),
            selector: SelectorKind::default(),
            ipc: IpcEstimator::default(),
            op_timeout: Duration::from_secs(2),
            dry_run: false,
            rebalance_every_cycle: false,
            max_cycles: None,
            thresholds: Thresholds::default(),
            format: OutputFormat::default(),
        }
    }
}

impl DaemonConfig {
    /// Checks the configuration before anything touches the kernel.
    pub fn validate(&self) -> Result<(), DaemonError> {
        if self.interval.is_zero() {
            return Err(DaemonError::ConfigError(
                "polling interval must be greater than zero".to_string(),
            ));
        }
        if self.op_timeout.is_zero() {
            return Err(DaemonError::ConfigError(
                "operation timeout must be greater than zero".to_string(),
            ));
        }
        if self.interface.trim().is_empty() {
            return Err(DaemonError::ConfigError(
                "network interface name must not be empty".to_string(),
            ));
        }
        if let IpcEstimator::Fixed(value) = self.ipc {
            if !value.is_finite() || value < 0.0 {
                return Err(DaemonError::ConfigError(format!(
                    "fixed IPC estimate must be a non-negative number, got {value}"
                )));
            }
        }
        if self.max_cycles == Some(0) {
            return Err(DaemonError::ConfigError(
                "max cycles must be at least 1".to_string(),
            ));
        }
        self.thresholds
            .validate()
            .map_err(|e| DaemonError::ConfigError(e.to_string()))
    }
}
