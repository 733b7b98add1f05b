// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end control loop.
//!
//! These tests drive the daemon through complete cycles against in-memory
//! kernels, proving that metrics, decision, kernel writes, registry commits
//! and rebalancing compose correctly.

use core_registry::{cpulist, CoreId};
use daemon::{Daemon, DaemonConfig, DaemonError, InitMode, OutputFormat, SelectorKind};
use decision_engine::Transition;
use kernel_control::{
    AffinityError, Governor, GovernorScope, KernelCoreController, ProcessInfo, ProcessTable,
    WriteError,
};
use power_monitor::{AcquisitionError, CoreSample, MetricsSource};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fakes ──────────────────────────────────────────────────────

/// Shared view of a simulated machine.
#[derive(Debug, Default)]
struct Machine {
    online: BTreeSet<CoreId>,
    governor: Option<Governor>,
    reject_online: BTreeSet<CoreId>,
    writes: Vec<(CoreId, bool)>,
    /// pid → Cpus_allowed_list
    affinity: BTreeMap<i32, String>,
}

type Shared = Arc<Mutex<Machine>>;

fn machine(cores: u32) -> Shared {
    Arc::new(Mutex::new(Machine {
        online: (0..cores).map(CoreId::new).collect(),
        ..Default::default()
    }))
}

/// Replays a script of `(load, irq, ipc)` readings; repeats the last one.
struct ScriptedSource {
    script: VecDeque<(f64, u64, f64)>,
    current: (f64, u64, f64),
    machine: Shared,
    fail_ipc: bool,
}

impl ScriptedSource {
    fn new(machine: &Shared, script: &[(f64, u64, f64)]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            current: (0.0, 0, 0.0),
            machine: Arc::clone(machine),
            fail_ipc: false,
        }
    }
}

impl MetricsSource for ScriptedSource {
    fn read_load(&mut self) -> Result<f64, AcquisitionError> {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        Ok(self.current.0)
    }

    fn read_irq_count(&mut self, _interface: &str) -> Result<u64, AcquisitionError> {
        Ok(self.current.1)
    }

    fn read_ipc(&mut self) -> Result<f64, AcquisitionError> {
        if self.fail_ipc {
            return Err(AcquisitionError::CommandFailed {
                command: "perf stat".to_string(),
                detail: "not supported".to_string(),
            });
        }
        Ok(self.current.2)
    }

    fn read_per_core(&mut self) -> Result<BTreeMap<CoreId, CoreSample>, AcquisitionError> {
        let m = self.machine.lock().unwrap();
        let max = m.online.iter().map(|c| c.index()).max().unwrap_or(0) + 1;
        Ok((1..max.max(4))
            .map(CoreId::new)
            .map(|c| {
                let online = m.online.contains(&c);
                (
                    c,
                    CoreSample {
                        utilization_percent: if online { f64::from(c.index()) } else { 0.0 },
                        online,
                        frequency_khz: if online { 1_500_000 } else { 0 },
                    },
                )
            })
            .collect())
    }
}

struct FakeKernel(Shared);

impl KernelCoreController for FakeKernel {
    fn set_online(&self, core: CoreId, online: bool) -> Result<(), WriteError> {
        let mut m = self.0.lock().unwrap();
        if m.reject_online.contains(&core) {
            return Err(WriteError::Io {
                path: format!("/sys/devices/system/cpu/{}/online", core.sysfs_name()),
                value: if online { "1" } else { "0" }.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        m.writes.push((core, online));
        if online {
            m.online.insert(core);
        } else {
            m.online.remove(&core);
        }
        Ok(())
    }

    fn set_governor(&self, governor: Governor, _scope: GovernorScope) -> Result<(), WriteError> {
        self.0.lock().unwrap().governor = Some(governor);
        Ok(())
    }

    fn is_online(&self, core: CoreId) -> Result<bool, WriteError> {
        Ok(self.0.lock().unwrap().online.contains(&core))
    }

    fn current_governor(&self, _core: CoreId) -> Result<Governor, WriteError> {
        Ok(self.0.lock().unwrap().governor.unwrap_or(Governor::Schedutil))
    }
}

struct FakeProcesses(Shared);

impl ProcessTable for FakeProcesses {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>, AffinityError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .affinity
            .keys()
            .map(|&pid| ProcessInfo {
                pid,
                name: format!("task-{pid}"),
                last_core: None,
                kernel_thread: false,
            })
            .collect())
    }

    fn affinity(&self, pid: i32) -> Result<BTreeSet<CoreId>, AffinityError> {
        let m = self.0.lock().unwrap();
        let list = m.affinity.get(&pid).ok_or(AffinityError::Vanished { pid })?;
        cpulist::parse(list).ok_or(AffinityError::Parse {
            path: format!("/proc/{pid}/status"),
            detail: list.clone(),
        })
    }

    fn set_affinity(&self, pid: i32, cores: &BTreeSet<CoreId>) -> Result<(), AffinityError> {
        let mut m = self.0.lock().unwrap();
        let entry = m.affinity.get_mut(&pid).ok_or(AffinityError::Vanished { pid })?;
        *entry = cpulist::format(cores);
        Ok(())
    }
}

// ── Helpers ────────────────────────────────────────────────────

fn config() -> DaemonConfig {
    DaemonConfig {
        interval: Duration::from_millis(1),
        selector: SelectorKind::HighestId,
        ..Default::default()
    }
}

fn build(
    config: DaemonConfig,
    machine: &Shared,
    cores: u32,
    script: &[(f64, u64, f64)],
) -> Result<Daemon, DaemonError> {
    Daemon::new(
        config,
        cores,
        Box::new(ScriptedSource::new(machine, script)),
        Box::new(FakeKernel(Arc::clone(machine))),
        Box::new(FakeProcesses(Arc::clone(machine))),
    )
}

fn ids(ids: &[u32]) -> Vec<CoreId> {
    ids.iter().copied().map(CoreId::new).collect()
}

// ── Scenarios ──────────────────────────────────────────────────

#[test]
fn test_quiet_system_parks_one_core() {
    let m = machine(4);
    let mut daemon = build(config(), &m, 4, &[(5.0, 1000, 0.3)]).unwrap();
    assert_eq!(daemon.registry().active_count(), 3);

    let report = daemon.run_cycle();
    assert_eq!(
        report.outcome.as_ref().unwrap().transition,
        Transition::Deactivate(CoreId::new(3))
    );
    assert_eq!(report.registry.active, ids(&[1, 2]));
    assert_eq!(report.registry.offline, ids(&[3]));

    let m = m.lock().unwrap();
    assert_eq!(m.governor, Some(Governor::Powersave));
    assert!(!m.online.contains(&CoreId::new(3)));
}

#[test]
fn test_load_spike_wakes_one_core() {
    let m = machine(4);
    {
        let mut guard = m.lock().unwrap();
        guard.online.remove(&CoreId::new(2));
        guard.online.remove(&CoreId::new(3));
    }
    let cfg = DaemonConfig {
        init: InitMode::FromKernel,
        ..config()
    };
    let mut daemon = build(cfg, &m, 4, &[(15.0, 1000, 0.3)]).unwrap();
    assert_eq!(daemon.registry().active().iter().copied().collect::<Vec<_>>(), ids(&[1]));

    let report = daemon.run_cycle();
    assert_eq!(
        report.outcome.unwrap().transition,
        Transition::Activate(CoreId::new(2))
    );
    assert_eq!(report.registry.active, ids(&[1, 2]));
    assert_eq!(m.lock().unwrap().governor, Some(Governor::Performance));
}

#[test]
fn test_minimum_active_holds() {
    let m = machine(2);
    let mut daemon = build(config(), &m, 2, &[(5.0, 1000, 0.3)]).unwrap();

    let report = daemon.run_cycle();
    assert_eq!(report.outcome.unwrap().transition, Transition::Hold);
    assert_eq!(report.registry.active, ids(&[1]));
    // Only the startup write happened.
    assert_eq!(m.lock().unwrap().writes, vec![(CoreId::new(1), true)]);
}

#[test]
fn test_pinned_process_follows_core_offline() {
    let m = machine(4);
    m.lock().unwrap().affinity.insert(4242, "3".to_string());
    m.lock().unwrap().affinity.insert(4243, "0-3".to_string());
    let mut daemon = build(config(), &m, 4, &[(5.0, 1000, 0.3)]).unwrap();

    let report = daemon.run_cycle();
    let rebalance = report.rebalance.expect("rebalance runs after a deactivation");
    assert_eq!(rebalance.reassigned, vec![4242]);
    assert_eq!(rebalance.target, Some(CoreId::new(1)));

    let m = m.lock().unwrap();
    let allowed = cpulist::parse(&m.affinity[&4242]).unwrap();
    assert_eq!(allowed.into_iter().collect::<Vec<_>>(), ids(&[1]));
    assert!(m.online.contains(&CoreId::new(1)));
    assert_eq!(m.affinity[&4243], "0-3");
}

#[test]
fn test_rejected_write_leaves_registry_unchanged() {
    let m = machine(4);
    let mut daemon = build(config(), &m, 4, &[(5.0, 1000, 0.3)]).unwrap();
    m.lock().unwrap().reject_online.insert(CoreId::new(3));
    let before = daemon.registry().clone();

    let report = daemon.run_cycle();
    assert!(report.outcome.is_none());
    assert!(report.error.unwrap().contains("core 3"));
    assert!(report.rebalance.is_none());
    assert_eq!(daemon.registry(), &before);
    assert!(m.lock().unwrap().online.contains(&CoreId::new(3)));
}

// ── Startup ────────────────────────────────────────────────────

#[test]
fn test_all_active_init_brings_cores_online() {
    let m = machine(4);
    m.lock().unwrap().online = ids(&[0, 1]).into_iter().collect();
    m.lock().unwrap().reject_online.insert(CoreId::new(3));

    let daemon = build(config(), &m, 4, &[]).unwrap();
    assert_eq!(
        daemon.registry().active().iter().copied().collect::<Vec<_>>(),
        ids(&[1, 2])
    );
    assert!(daemon.registry().is_offline(CoreId::new(3)));
    assert!(m.lock().unwrap().online.contains(&CoreId::new(2)));
}

#[test]
fn test_insufficient_cores_is_fatal() {
    let m = machine(3);
    m.lock().unwrap().online = ids(&[0]).into_iter().collect();
    let cfg = DaemonConfig {
        init: InitMode::FromKernel,
        ..config()
    };
    let err = build(cfg, &m, 3, &[]).unwrap_err();
    assert!(matches!(err, DaemonError::Registry(_)));
}

#[test]
fn test_invalid_config_is_fatal() {
    let m = machine(3);
    let cfg = DaemonConfig {
        interval: Duration::ZERO,
        ..config()
    };
    assert!(matches!(
        build(cfg, &m, 3, &[]),
        Err(DaemonError::ConfigError(_))
    ));
    assert!(m.lock().unwrap().writes.is_empty());
}

// ── Modes ──────────────────────────────────────────────────────

#[test]
fn test_dry_run_never_touches_kernel() {
    let m = machine(4);
    m.lock().unwrap().affinity.insert(7, "3".to_string());
    let cfg = DaemonConfig {
        dry_run: true,
        rebalance_every_cycle: true,
        ..config()
    };
    let mut daemon = build(cfg, &m, 4, &[(1.0, 0, 0.1)]).unwrap();

    let report = daemon.run_cycle();
    let outcome = report.outcome.unwrap();
    assert_eq!(outcome.transition, Transition::Deactivate(CoreId::new(3)));
    assert!(!outcome.committed);
    assert!(report.rebalance.is_none());
    assert_eq!(daemon.registry().active_count(), 3);

    let m = m.lock().unwrap();
    assert!(m.writes.is_empty());
    assert_eq!(m.governor, None);
    assert_eq!(m.affinity[&7], "3");
}

#[test]
fn test_rebalance_every_cycle() {
    let m = machine(4);
    let cfg = DaemonConfig {
        rebalance_every_cycle: true,
        ..config()
    };
    let mut daemon = build(cfg, &m, 4, &[(1.0, 0, 0.1), (50.0, 0, 0.1)]).unwrap();

    daemon.run_cycle();
    // A process lands on the parked core between cycles.
    m.lock().unwrap().affinity.insert(99, "3".to_string());

    let report = daemon.run_cycle();
    assert_eq!(
        report.outcome.unwrap().transition,
        Transition::Activate(CoreId::new(3))
    );
    // Core 3 is back, so nothing is confined to offline cores any more.
    assert_eq!(report.rebalance.unwrap().reassigned, Vec::<i32>::new());
}

#[test]
fn test_degraded_metric_does_not_abort_cycle() {
    let m = machine(3);
    let machine_ref = Arc::clone(&m);
    let mut source = ScriptedSource::new(&machine_ref, &[(2.0, 0, 0.0)]);
    source.fail_ipc = true;
    let mut daemon = Daemon::new(
        config(),
        3,
        Box::new(source),
        Box::new(FakeKernel(Arc::clone(&m))),
        Box::new(FakeProcesses(Arc::clone(&m))),
    )
    .unwrap();

    let report = daemon.run_cycle();
    assert_eq!(report.snapshot.ipc, 0.0);
    assert_eq!(
        report.outcome.unwrap().transition,
        Transition::Deactivate(CoreId::new(2))
    );
}

#[test]
fn test_least_utilized_selector_end_to_end() {
    let m = machine(4);
    let cfg = DaemonConfig {
        selector: SelectorKind::LeastUtilized,
        ..config()
    };
    let mut daemon = build(cfg, &m, 4, &[(1.0, 0, 0.1)]).unwrap();
    // Fake utilisation equals the core index: core 1 is the least busy.
    let report = daemon.run_cycle();
    assert_eq!(
        report.outcome.unwrap().transition,
        Transition::Deactivate(CoreId::new(1))
    );
}

// ── Status ─────────────────────────────────────────────────────

#[test]
fn test_status_render_formats() {
    let m = machine(3);
    let mut daemon = build(config(), &m, 3, &[(30.0, 10, 0.9)]).unwrap();
    assert!(daemon.status().contains("no cycle has run yet"));

    daemon.run_cycle();
    let text = daemon.status();
    assert!(text.contains("30.0 %"));
    assert!(text.contains("Active:       1-2 (2)"));

    let json_daemon = build(
        DaemonConfig {
            format: OutputFormat::Json,
            ..config()
        },
        &m,
        3,
        &[],
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json_daemon.status()).unwrap();
    assert!(value["snapshot"].is_null());
    assert_eq!(value["registry"]["active"].as_array().unwrap().len(), 2);
}

// ── Async loop ─────────────────────────────────────────────────

#[tokio::test]
async fn test_run_stops_at_max_cycles() {
    let m = machine(5);
    let cfg = DaemonConfig {
        max_cycles: Some(3),
        ..config()
    };
    let daemon = build(cfg, &m, 5, &[(1.0, 0, 0.1)]).unwrap();

    let mut seen = Vec::new();
    let daemon = daemon
        .run(std::future::pending::<()>(), |_, report| seen.push(report.cycle))
        .await
        .unwrap();

    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(daemon.cycles(), 3);
    // Three quiet cycles park cores 4, 3 and 2; core 1 stays.
    assert_eq!(
        daemon.registry().active().iter().copied().collect::<Vec<_>>(),
        ids(&[1])
    );
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let m = machine(3);
    let cfg = DaemonConfig {
        interval: Duration::from_secs(3600),
        ..config()
    };
    let daemon = build(cfg, &m, 3, &[(50.0, 0, 0.1)]).unwrap();

    let daemon = daemon
        .run(async {}, |_, _| {})
        .await
        .unwrap();
    assert_eq!(daemon.cycles(), 1);
}
