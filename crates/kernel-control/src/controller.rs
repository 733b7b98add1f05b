// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`KernelCoreController`] trait and its sysfs implementation.
//!
//! Writes go to:
//! - `/sys/devices/system/cpu/cpuN/online` — `"1"` / `"0"`.
//! - `/sys/devices/system/cpu/cpuN/cpufreq/scaling_governor` — governor name.
//!
//! Both attributes are idempotent: writing the current value succeeds and
//! changes nothing. Root (or `CAP_SYS_ADMIN`) is required.

use crate::{Governor, GovernorScope, WriteError};
use core_registry::CoreId;
use power_monitor::CPU_SYSFS_ROOT;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Privileged core-state operations.
///
/// Implementations may write sysfs, call into a helper, or record calls in
/// memory for tests; the decision engine only relies on this contract:
/// a returned `Ok(())` means the kernel accepted the change.
pub trait KernelCoreController: Send + Sync {
    /// Brings `core` online or takes it offline.
    fn set_online(&self, core: CoreId, online: bool) -> Result<(), WriteError>;

    /// Selects the frequency governor for `scope`.
    fn set_governor(&self, governor: Governor, scope: GovernorScope) -> Result<(), WriteError>;

    /// Re-reads `core`'s hotplug state from the kernel.
    fn is_online(&self, core: CoreId) -> Result<bool, WriteError>;

    /// Reads the governor currently selected on `core`.
    fn current_governor(&self, core: CoreId) -> Result<Governor, WriteError>;
}

/// Controller backed by `/sys/devices/system/cpu`.
#[derive(Debug, Clone)]
pub struct SysfsController {
    cpu_root: PathBuf,
    max_cores: u32,
}

impl SysfsController {
    /// Creates a controller for the live sysfs tree.
    pub fn new(max_cores: u32) -> Self {
        Self::with_root(CPU_SYSFS_ROOT, max_cores)
    }

    /// Creates a controller writing below an alternative root.
    pub fn with_root(cpu_root: impl Into<PathBuf>, max_cores: u32) -> Self {
        Self {
            cpu_root: cpu_root.into(),
            max_cores,
        }
    }

    fn governor_path(&self, core: CoreId) -> PathBuf {
        self.cpu_root
            .join(core.sysfs_name())
            .join("cpufreq")
            .join("scaling_governor")
    }

    fn has_cpufreq(&self, core: CoreId) -> bool {
        self.cpu_root.join(core.sysfs_name()).join("cpufreq").is_dir()
    }
}

/// Writes `value` to an existing sysfs attribute. Never creates files.
fn write_attribute(path: &Path, value: &str) -> Result<(), WriteError> {
    std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .and_then(|mut f| f.write_all(value.as_bytes()))
        .map_err(|e| WriteError::Io {
            path: path.display().to_string(),
            value: value.to_string(),
            source: e,
        })
}

impl KernelCoreController for SysfsController {
    fn set_online(&self, core: CoreId, online: bool) -> Result<(), WriteError> {
        if core.is_reserved() {
            return Err(WriteError::ReservedCore { core });
        }
        let path = self.cpu_root.join(core.sysfs_name()).join("online");
        write_attribute(&path, if online { "1" } else { "0" })?;
        tracing::info!(
            core = %core,
            state = if online { "online" } else { "offline" },
            "core state written"
        );
        Ok(())
    }

    fn set_governor(&self, governor: Governor, scope: GovernorScope) -> Result<(), WriteError> {
        let cores: Vec<CoreId> = match scope {
            GovernorScope::Core(core) => vec![core],
            GovernorScope::AllCores => (0..self.max_cores)
                .map(CoreId::new)
                .filter(|c| self.has_cpufreq(*c))
                .collect(),
        };
        if cores.is_empty() {
            return Err(WriteError::NoCpufreq { scope });
        }

        let mut accepted = 0usize;
        let mut first_error = None;
        for core in cores {
            match write_attribute(&self.governor_path(core), governor.as_str()) {
                Ok(()) => accepted += 1,
                Err(e) => {
                    tracing::warn!(core = %core, error = %e, "governor write rejected");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if accepted == 0 => Err(e),
            _ => {
                tracing::info!(governor = %governor, scope = %scope, accepted, "governor set");
                Ok(())
            }
        }
    }

    fn is_online(&self, core: CoreId) -> Result<bool, WriteError> {
        power_monitor::read_core_online(&self.cpu_root, core)
            .map_err(|source| WriteError::Verify { core, source })
    }

    fn current_governor(&self, core: CoreId) -> Result<Governor, WriteError> {
        let path = self.governor_path(core);
        let value = std::fs::read_to_string(&path).map_err(|e| WriteError::Verify {
            core,
            source: power_monitor::AcquisitionError::ReadError {
                path: path.display().to_string(),
                source: e,
            },
        })?;
        value.parse().map_err(|_| WriteError::UnknownGovernor {
            path: path.display().to_string(),
            value: value.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn fixture(label: &str, cores: u32) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "coregov_control_{label}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        for i in 0..cores {
            let cpu = dir.join(format!("cpu{i}"));
            std::fs::create_dir_all(cpu.join("cpufreq")).unwrap();
            if i != 0 {
                write(&cpu.join("online"), "1\n");
            }
            write(&cpu.join("cpufreq/scaling_governor"), "schedutil\n");
        }
        dir
    }

    fn write(path: &Path, content: &str) {
        let mut f = std::fs::File::create(path).unwrap();
        write!(f, "{content}").unwrap();
    }

    fn read(path: PathBuf) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_set_online_writes_attribute() {
        let dir = fixture("online", 3);
        let ctl = SysfsController::with_root(&dir, 3);

        ctl.set_online(CoreId::new(2), false).unwrap();
        assert_eq!(read(dir.join("cpu2/online")), "0");
        assert!(!ctl.is_online(CoreId::new(2)).unwrap());

        ctl.set_online(CoreId::new(2), true).unwrap();
        ctl.set_online(CoreId::new(2), true).unwrap();
        assert!(ctl.is_online(CoreId::new(2)).unwrap());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reserved_core_refused() {
        let dir = fixture("reserved", 2);
        let ctl = SysfsController::with_root(&dir, 2);
        assert!(matches!(
            ctl.set_online(CoreId::RESERVED, false),
            Err(WriteError::ReservedCore { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_attribute_is_not_created() {
        let dir = fixture("missing", 2);
        let ctl = SysfsController::with_root(&dir, 2);
        assert!(matches!(
            ctl.set_online(CoreId::new(7), false),
            Err(WriteError::Io { .. })
        ));
        assert!(!dir.join("cpu7/online").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_set_governor_all_cores() {
        let dir = fixture("gov_all", 3);
        // cpu2 is offline: no cpufreq directory.
        std::fs::remove_dir_all(dir.join("cpu2/cpufreq")).unwrap();
        let ctl = SysfsController::with_root(&dir, 3);

        ctl.set_governor(Governor::Powersave, GovernorScope::AllCores)
            .unwrap();
        assert_eq!(read(dir.join("cpu0/cpufreq/scaling_governor")), "powersave");
        assert_eq!(read(dir.join("cpu1/cpufreq/scaling_governor")), "powersave");
        assert_eq!(
            ctl.current_governor(CoreId::new(1)).unwrap(),
            Governor::Powersave
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_set_governor_single_core() {
        let dir = fixture("gov_one", 3);
        let ctl = SysfsController::with_root(&dir, 3);
        ctl.set_governor(Governor::Performance, GovernorScope::Core(CoreId::new(1)))
            .unwrap();
        assert_eq!(read(dir.join("cpu1/cpufreq/scaling_governor")), "performance");
        assert_eq!(read(dir.join("cpu2/cpufreq/scaling_governor")), "schedutil\n");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_set_governor_without_cpufreq() {
        let dir = std::env::temp_dir().join(format!("coregov_control_nofreq_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("cpu0")).unwrap();
        let ctl = SysfsController::with_root(&dir, 1);
        assert!(matches!(
            ctl.set_governor(Governor::Powersave, GovernorScope::AllCores),
            Err(WriteError::NoCpufreq { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_governor_reported() {
        let dir = fixture("gov_unknown", 2);
        write(&dir.join("cpu1/cpufreq/scaling_governor"), "turbo\n");
        let ctl = SysfsController::with_root(&dir, 2);
        assert!(matches!(
            ctl.current_governor(CoreId::new(1)),
            Err(WriteError::UnknownGovernor { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
