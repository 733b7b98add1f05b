// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Process enumeration and CPU affinity.
//!
//! - `/proc/<pid>/stat` — command name, flags (field 9) and the CPU the
//!   task last ran on (field 39).
//! - `/proc/<pid>/status` — `Cpus_allowed_list:` in cpu-list syntax.
//! - `sched_setaffinity(2)` — the write side.
//!
//! Processes come and go while the table is walked; any per-process read
//! may fail with [`AffinityError::Vanished`].

use crate::AffinityError;
use core_registry::{cpulist, CoreId};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::PathBuf;

/// `PF_KTHREAD` from `include/linux/sched.h`.
const PF_KTHREAD: u64 = 0x0020_0000;

/// A live process as seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProcessInfo {
    pub pid: i32,
    /// Command name (`comm`).
    pub name: String,
    /// CPU the process last ran on, if reported.
    pub last_core: Option<CoreId>,
    /// Kernel threads are bound by the kernel and are never re-pinned.
    pub kernel_thread: bool,
}

/// Process enumeration and affinity control.
pub trait ProcessTable {
    /// Enumerates live processes.
    fn list_processes(&self) -> Result<Vec<ProcessInfo>, AffinityError>;

    /// Returns the set of cores `pid` may run on.
    fn affinity(&self, pid: i32) -> Result<BTreeSet<CoreId>, AffinityError>;

    /// Restricts `pid` to `cores`.
    fn set_affinity(&self, pid: i32, cores: &BTreeSet<CoreId>) -> Result<(), AffinityError>;
}

/// Process table backed by procfs and `sched_setaffinity(2)`.
#[derive(Debug, Clone)]
pub struct ProcfsProcessTable {
    proc_root: PathBuf,
}

impl Default for ProcfsProcessTable {
    fn default() -> Self {
        Self::with_root(power_monitor::PROC_ROOT)
    }
}

impl ProcfsProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads process state below an alternative procfs root.
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    fn read_pid_file(&self, pid: i32, file: &str) -> Result<String, AffinityError> {
        let path = self.proc_root.join(pid.to_string()).join(file);
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AffinityError::Vanished { pid },
            ErrorKind::PermissionDenied => AffinityError::PermissionDenied { pid },
            _ if e.raw_os_error() == Some(libc::ESRCH) => AffinityError::Vanished { pid },
            _ => AffinityError::Io {
                path: path.display().to_string(),
                source: e,
            },
        })
    }
}

impl ProcessTable for ProcfsProcessTable {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>, AffinityError> {
        let entries = std::fs::read_dir(&self.proc_root).map_err(|e| AffinityError::Io {
            path: self.proc_root.display().to_string(),
            source: e,
        })?;

        let mut processes: Vec<ProcessInfo> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str()?.parse::<i32>().ok())
            .filter_map(|pid| match self.read_pid_file(pid, "stat") {
                Ok(content) => parse_stat(pid, &content),
                Err(e) => {
                    tracing::trace!(pid, error = %e, "skipping process during enumeration");
                    None
                }
            })
            .collect();
        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }

    fn affinity(&self, pid: i32) -> Result<BTreeSet<CoreId>, AffinityError> {
        let content = self.read_pid_file(pid, "status")?;
        parse_allowed_list(&content).ok_or_else(|| AffinityError::Parse {
            path: format!("{}/{pid}/status", self.proc_root.display()),
            detail: "missing or malformed Cpus_allowed_list".to_string(),
        })
    }

    fn set_affinity(&self, pid: i32, cores: &BTreeSet<CoreId>) -> Result<(), AffinityError> {
        sched_setaffinity(pid, cores)
    }
}

/// Parses `/proc/<pid>/stat`.
///
/// The command name is parenthesised and may itself contain spaces and
/// parentheses, so fields are counted from the *last* `)`.
pub(crate) fn parse_stat(pid: i32, content: &str) -> Option<ProcessInfo> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    let name = content.get(open + 1..close)?.to_string();
    // Fields after the name start at field 3 (state).
    let rest: Vec<&str> = content.get(close + 1..)?.split_whitespace().collect();
    let field = |n: usize| rest.get(n - 3).copied();

    let flags: u64 = field(9)?.parse().ok()?;
    let last_core = field(39)
        .and_then(|s| s.parse::<u32>().ok())
        .map(CoreId::new);

    Some(ProcessInfo {
        pid,
        name,
        last_core,
        kernel_thread: flags & PF_KTHREAD != 0,
    })
}

/// Extracts `Cpus_allowed_list` from `/proc/<pid>/status`.
pub(crate) fn parse_allowed_list(status: &str) -> Option<BTreeSet<CoreId>> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Cpus_allowed_list:"))
        .and_then(cpulist::parse)
}

#[cfg(target_os = "linux")]
fn sched_setaffinity(pid: i32, cores: &BTreeSet<CoreId>) -> Result<(), AffinityError> {
    if cores.is_empty() {
        return Err(AffinityError::InvalidCoreSet {
            pid,
            detail: "empty core set".to_string(),
        });
    }
    let capacity = libc::CPU_SETSIZE as u32;
    if let Some(core) = cores.iter().find(|c| c.index() >= capacity) {
        return Err(AffinityError::InvalidCoreSet {
            pid,
            detail: format!("core {core} exceeds CPU_SETSIZE ({capacity})"),
        });
    }

    // SAFETY: cpu_set_t is a plain bitmask; a zeroed value is the empty set
    // and every index passed to CPU_SET was bounds-checked above.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        for core in cores {
            libc::CPU_SET(core.index() as usize, &mut set);
        }
        libc::sched_setaffinity(pid, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc == 0 {
        return Ok(());
    }

    let err = std::io::Error::last_os_error();
    Err(match err.raw_os_error() {
        Some(libc::ESRCH) => AffinityError::Vanished { pid },
        Some(libc::EPERM) => AffinityError::PermissionDenied { pid },
        Some(libc::EINVAL) => AffinityError::InvalidCoreSet {
            pid,
            detail: format!("kernel rejected {}", cpulist::format(cores)),
        },
        _ => AffinityError::Os { pid, source: err },
    })
}

#[cfg(not(target_os = "linux"))]
fn sched_setaffinity(pid: i32, _cores: &BTreeSet<CoreId>) -> Result<(), AffinityError> {
    Err(AffinityError::Os {
        pid,
        source: std::io::Error::new(ErrorKind::Unsupported, "sched_setaffinity is Linux-only"),
    })
}
