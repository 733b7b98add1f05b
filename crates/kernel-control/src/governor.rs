// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! cpufreq scaling governors.

use core_registry::CoreId;
use std::fmt;
use std::str::FromStr;

/// A cpufreq scaling governor, as written to `scaling_governor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Governor {
    Performance,
    Powersave,
    Schedutil,
    Ondemand,
    Conservative,
    Userspace,
}

impl Governor {
    /// The sysfs spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Powersave => "powersave",
            Self::Schedutil => "schedutil",
            Self::Ondemand => "ondemand",
            Self::Conservative => "conservative",
            Self::Userspace => "userspace",
        }
    }
}

impl fmt::Display for Governor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Governor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "performance" => Ok(Self::Performance),
            "powersave" => Ok(Self::Powersave),
            "schedutil" => Ok(Self::Schedutil),
            "ondemand" => Ok(Self::Ondemand),
            "conservative" => Ok(Self::Conservative),
            "userspace" => Ok(Self::Userspace),
            other => Err(format!("unknown governor '{other}'")),
        }
    }
}

/// Which cores a governor change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum GovernorScope {
    /// Every core that exposes `cpufreq`, core 0 included.
    AllCores,
    /// A single core.
    Core(CoreId),
}

impl fmt::Display for GovernorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllCores => f.write_str("all cores"),
            Self::Core(core) => write!(f, "core {core}"),
        }
    }
}
