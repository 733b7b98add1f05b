// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Instructions-per-cycle estimation.
//!
//! Two modes:
//! - [`IpcEstimator::Fixed`] — a constant, for hosts without PMU access.
//! - [`IpcEstimator::Perf`] — a system-wide `perf stat` sample:
//!
//! ```text
//! perf stat -x, -a -e instructions,cycles -- sleep <window>
//! ```
//!
//! `perf` writes CSV to stderr, one event per line
//! (`value,unit,event,run-time,percent,...`). On hybrid parts the same event
//! appears once per PMU (`cpu_core/instructions/`, `cpu_atom/instructions/`);
//! the values are summed.

use crate::AcquisitionError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// IPC value used when no PMU sample is available.
pub const DEFAULT_IPC_ESTIMATE: f64 = 0.75;

/// How the IPC signal is obtained.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IpcEstimator {
    /// Always report this value.
    Fixed(f64),
    /// Sample hardware counters with `perf` over `window`.
    Perf { window: Duration },
}

impl Default for IpcEstimator {
    fn default() -> Self {
        Self::Fixed(DEFAULT_IPC_ESTIMATE)
    }
}

impl IpcEstimator {
    /// Parses `"fixed:<value>"` or `"perf:<seconds>"`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (kind, arg) = s
            .split_once(':')
            .ok_or_else(|| format!("expected 'fixed:<value>' or 'perf:<seconds>', got '{s}'"))?;
        let value: f64 = arg
            .trim()
            .parse()
            .map_err(|_| format!("invalid number '{arg}' in '{s}'"))?;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("value in '{s}' must be a non-negative number"));
        }
        match kind.trim().to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed(value)),
            "perf" if value > 0.0 => Ok(Self::Perf {
                window: Duration::from_secs_f64(value),
            }),
            "perf" => Err("perf sampling window must be positive".to_string()),
            other => Err(format!("unknown IPC source '{other}'; expected 'fixed' or 'perf'")),
        }
    }

    /// Produces one IPC reading. `timeout` bounds the external command,
    /// on top of the sampling window.
    pub fn estimate(&self, timeout: Duration) -> Result<f64, AcquisitionError> {
        match self {
            Self::Fixed(value) => Ok(*value),
            Self::Perf { window } => {
                let window_arg = format!("{:.3}", window.as_secs_f64());
                let mut cmd = Command::new("perf");
                cmd.args(["stat", "-x,", "-a", "-e", "instructions,cycles", "--", "sleep"])
                    .arg(&window_arg);
                let stderr = run_with_timeout(cmd, "perf stat", *window + timeout)?;
                parse_perf_csv(&stderr)
            }
        }
    }
}

/// Runs `cmd`, killing it if it outlives `timeout`. Returns captured stderr.
///
/// Blocking: drives the child on a private current-thread runtime, so it
/// must be called from a plain or `spawn_blocking` thread, never from
/// inside an async task. Both pipes are drained while the child runs.
fn run_with_timeout(
    mut cmd: Command,
    label: &str,
    timeout: Duration,
) -> Result<String, AcquisitionError> {
    let failed = |detail: String| AcquisitionError::CommandFailed {
        command: label.to_string(),
        detail,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| failed(e.to_string()))?;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = runtime
        .block_on(async { tokio::time::timeout(timeout, cmd.output()).await })
        .map_err(|_| AcquisitionError::Timeout {
            command: label.to_string(),
            timeout,
        })?
        .map_err(|e| failed(e.to_string()))?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(failed(format!("{}: {}", output.status, stderr.trim())));
    }
    Ok(stderr)
}

/// Extracts `instructions / cycles` from `perf stat -x,` output.
pub(crate) fn parse_perf_csv(output: &str) -> Result<f64, AcquisitionError> {
    let mut instructions = None::<u64>;
    let mut cycles = None::<u64>;

    for line in output.lines() {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 3 {
            continue;
        }
        // "<not counted>" / "<not supported>" leave the event unset.
        let Ok(value) = fields[0].trim().parse::<u64>() else {
            continue;
        };
        let slot = match event_base(fields[2]) {
            "instructions" => &mut instructions,
            "cycles" => &mut cycles,
            _ => continue,
        };
        *slot = Some(slot.unwrap_or(0).saturating_add(value));
    }

    match (instructions, cycles) {
        (Some(i), Some(c)) if c > 0 => Ok(i as f64 / c as f64),
        _ => Err(AcquisitionError::ParseError {
            path: "perf stat".to_string(),
            detail: "missing or zero instructions/cycles counters".to_string(),
        }),
    }
}

/// Strips PMU prefixes and modifiers: `cpu_core/cycles/` → `cycles`,
/// `instructions:u` → `instructions`.
fn event_base(event: &str) -> &str {
    let event = event.trim();
    let event = event
        .strip_suffix('/')
        .and_then(|e| e.rsplit_once('/'))
        .map(|(_, name)| name)
        .unwrap_or(event);
    event.split(':').next().unwrap_or(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_estimator() {
        assert_eq!(IpcEstimator::parse("fixed:0.5").unwrap(), IpcEstimator::Fixed(0.5));
        assert_eq!(
            IpcEstimator::parse("perf:1").unwrap(),
            IpcEstimator::Perf {
                window: Duration::from_secs(1)
            }
        );
        assert!(IpcEstimator::parse("perf:0").is_err());
        assert!(IpcEstimator::parse("fixed:-1").is_err());
        assert!(IpcEstimator::parse("magic:1").is_err());
        assert!(IpcEstimator::parse("0.7").is_err());
    }

    #[test]
    fn test_fixed_estimate() {
        let ipc = IpcEstimator::default().estimate(Duration::from_secs(1)).unwrap();
        assert!((ipc - DEFAULT_IPC_ESTIMATE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_perf_csv() {
        let out = "\
1500000,,instructions,1000000,100.00,,
2000000,,cycles,1000000,100.00,,
";
        let ipc = parse_perf_csv(out).unwrap();
        assert!((ipc - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_parse_perf_csv_hybrid() {
        let out = "\
1000,,cpu_core/instructions/,10,100.00,,
500,,cpu_atom/instructions/,10,100.00,,
1000,,cpu_core/cycles/,10,100.00,,
1000,,cpu_atom/cycles/,10,100.00,,
";
        let ipc = parse_perf_csv(out).unwrap();
        assert!((ipc - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_parse_perf_csv_not_supported() {
        let out = "\
<not supported>,,instructions,0,100.00,,
<not supported>,,cycles,0,100.00,,
";
        assert!(parse_perf_csv(out).is_err());
    }

    #[test]
    fn test_event_base() {
        assert_eq!(event_base("cycles"), "cycles");
        assert_eq!(event_base("instructions:u"), "instructions");
        assert_eq!(event_base("cpu_core/cycles/"), "cycles");
        assert_eq!(event_base("stalled-cycles-frontend"), "stalled-cycles-frontend");
    }

    #[test]
    fn test_missing_command() {
        let cmd = Command::new("/nonexistent/perf");
        let result = run_with_timeout(cmd, "perf", Duration::from_secs(1));
        assert!(matches!(result, Err(AcquisitionError::CommandFailed { .. })));
    }

    #[test]
    fn test_command_timeout() {
        if !std::path::Path::new("/bin/sleep").exists() {
            return;
        }
        let mut cmd = Command::new("/bin/sleep");
        cmd.arg("5");
        let result = run_with_timeout(cmd, "sleep", Duration::from_millis(100));
        assert!(matches!(result, Err(AcquisitionError::Timeout { .. })));
    }

    #[test]
    fn test_large_stderr_does_not_stall() {
        if !std::path::Path::new("/bin/sh").exists() {
            return;
        }
        // Far beyond a pipe buffer; the child would block if stderr were
        // only read after exit.
        let mut cmd = Command::new("/bin/sh");
        let script = "i=0; while [ $i -lt 4000 ]; do \
                      echo 0123456789012345678901234567890123456789 >&2; \
                      i=$((i+1)); done";
        cmd.args(["-c", script]);
        let stderr = run_with_timeout(cmd, "sh", Duration::from_secs(20)).unwrap();
        assert_eq!(stderr.lines().count(), 4000);
    }

    #[test]
    fn test_failed_command_reports_stderr() {
        if !std::path::Path::new("/bin/sh").exists() {
            return;
        }
        let mut cmd = Command::new("/bin/sh");
        cmd.args(["-c", "echo no counters >&2; exit 3"]);
        match run_with_timeout(cmd, "sh", Duration::from_secs(5)) {
            Err(AcquisitionError::CommandFailed { detail, .. }) => {
                assert!(detail.contains("no counters"));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }
}
