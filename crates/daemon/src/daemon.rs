// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The control loop.
//!
//! ```text
//! ┌──────────── one cycle (blocking worker) ────────────┐
//! │ capture → decide → set_online → commit → governor   │
//! │                                  └─→ rebalance      │
//! └──────────────────────────────────────────────────────┘
//!        │
//!        ▼
//!   sleep(interval)  ──or──  Ctrl-C → stop
//! ```
//!
//! A cycle never fails: metric gaps degrade, rejected writes are reported in
//! the [`CycleReport`], and the next cycle starts after the interval.

use crate::{
    DaemonConfig, DaemonError, InitMode, ProcessRebalancer, RebalanceReport, StatusReporter,
};
use core_registry::{CoreId, CoreStateRegistry, RegistrySnapshot};
use decision_engine::{DecisionEngine, TransitionOutcome};
use kernel_control::{
    Bounded, Governor, KernelCoreController, ProcessTable, ProcfsProcessTable, SysfsController,
};
use power_monitor::{MetricsSnapshot, MetricsSource, ProcfsSource};
use std::future::Future;

// ── Cycle report ───────────────────────────────────────────────

/// What one cycle observed and did.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    pub snapshot: MetricsSnapshot,
    /// Present when the decision was applied (or skipped) without error.
    pub outcome: Option<TransitionOutcome>,
    /// Present when the transition was rejected.
    pub error: Option<String>,
    /// Present when a rebalancing pass ran.
    pub rebalance: Option<RebalanceReport>,
    /// Registry state at the end of the cycle.
    pub registry: RegistrySnapshot,
}

impl CycleReport {
    /// Returns a one-line summary suitable for logging.
    pub fn summary(&self) -> String {
        let action = match (&self.outcome, &self.error) {
            (Some(o), _) if o.committed => o.transition.to_string(),
            (Some(o), _) if !o.transition.is_hold() => format!("{} (not applied)", o.transition),
            (_, Some(e)) => format!("failed: {e}"),
            _ => "hold".to_string(),
        };
        format!(
            "Cycle {}: {} → {}, {} active / {} offline",
            self.cycle,
            self.snapshot.summary(),
            action,
            self.registry.active.len(),
            self.registry.offline.len(),
        )
    }
}

// ── Daemon ─────────────────────────────────────────────────────

/// Owns every collaborator of the control loop.
///
/// # Example
/// ```no_run
/// use daemon::{Daemon, DaemonConfig};
///
/// # async fn example() -> Result<(), daemon::DaemonError> {
/// let daemon = Daemon::for_host(DaemonConfig::default())?;
/// let shutdown = async {
///     let _ = tokio::signal::ctrl_c().await;
/// };
/// let daemon = daemon.run(shutdown, |_, report| println!("{}", report.summary())).await?;
/// println!("{}", daemon.status());
/// # Ok(())
/// # }
/// ```
pub struct Daemon {
    config: DaemonConfig,
    source: Box<dyn MetricsSource + Send>,
    controller: Box<dyn KernelCoreController>,
    processes: Box<dyn ProcessTable + Send>,
    registry: CoreStateRegistry,
    engine: DecisionEngine,
    rebalancer: ProcessRebalancer,
    reporter: StatusReporter,
    last_snapshot: Option<MetricsSnapshot>,
    cycles: u64,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("engine", &self.engine)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl Daemon {
    /// Assembles a daemon from its collaborators and seeds the registry.
    ///
    /// With [`InitMode::AllActive`] every managed core is written online;
    /// cores whose write is rejected start out offline. With
    /// [`InitMode::FromKernel`] the kernel's current view is adopted. In
    /// dry-run mode nothing is written and all-active is assumed.
    pub fn new(
        config: DaemonConfig,
        max_cores: u32,
        source: Box<dyn MetricsSource + Send>,
        controller: Box<dyn KernelCoreController>,
        processes: Box<dyn ProcessTable + Send>,
    ) -> Result<Self, DaemonError> {
        config.validate()?;
        let registry = seed_registry(&config, max_cores, controller.as_ref())?;
        tracing::info!(
            max_cores,
            init = %config.init,
            active = registry.active_count(),
            offline = registry.offline_count(),
            "core registry initialised"
        );

        let engine = DecisionEngine::new(config.thresholds, config.selector.create())
            .dry_run(config.dry_run);
        tracing::info!(
            selector = engine.selector_name(),
            dry_run = config.dry_run,
            interface = %config.interface,
            interval = ?config.interval,
            "daemon ready"
        );

        Ok(Self {
            reporter: StatusReporter::new(config.format),
            config,
            source,
            controller,
            processes,
            registry,
            engine,
            rebalancer: ProcessRebalancer::new(),
            last_snapshot: None,
            cycles: 0,
        })
    }

    /// Builds a daemon wired to the live `/proc` and `/sys` interfaces.
    pub fn for_host(config: DaemonConfig) -> Result<Self, DaemonError> {
        config.validate()?;
        let max_cores = power_monitor::discover_max_cores()?;
        let source = ProcfsSource::new(max_cores, config.ipc.clone())
            .command_timeout(config.op_timeout);
        let controller = Bounded::new(SysfsController::new(max_cores), config.op_timeout);
        Self::new(
            config,
            max_cores,
            Box::new(source),
            Box::new(controller),
            Box::new(ProcfsProcessTable::new()),
        )
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn registry(&self) -> &CoreStateRegistry {
        &self.registry
    }

    pub fn last_snapshot(&self) -> Option<&MetricsSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Number of cycles completed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Governor currently selected, as read from core 0.
    pub fn current_governor(&self) -> Option<Governor> {
        self.controller
            .current_governor(CoreId::RESERVED)
            .map_err(|e| tracing::debug!(error = %e, "cannot read current governor"))
            .ok()
    }

    /// Renders the current state with the configured reporter.
    pub fn status(&self) -> String {
        self.reporter.render(
            self.last_snapshot.as_ref(),
            &self.registry,
            self.current_governor(),
        )
    }

    /// Runs one complete cycle. Blocking.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let snapshot = self.source.capture(&self.config.interface);
        tracing::debug!(cycle = self.cycles, "{}", snapshot.summary());

        let (outcome, error) =
            match self
                .engine
                .step(&snapshot, &mut self.registry, self.controller.as_ref())
            {
                Ok(outcome) => (Some(outcome), None),
                Err(e) => {
                    tracing::error!(cycle = self.cycles, error = %e, "transition failed");
                    (None, Some(e.to_string()))
                }
            };

        let deactivated = outcome.as_ref().is_some_and(|o| o.deactivated());
        let rebalance = if !self.config.dry_run
            && (deactivated || self.config.rebalance_every_cycle)
        {
            Some(self.rebalancer.rebalance(
                self.processes.as_ref(),
                self.controller.as_ref(),
                &self.registry,
            ))
        } else {
            None
        };

        let report = CycleReport {
            cycle: self.cycles,
            snapshot: snapshot.clone(),
            outcome,
            error,
            rebalance,
            registry: self.registry.snapshot(),
        };
        self.last_snapshot = Some(snapshot);
        tracing::info!("{}", report.summary());
        report
    }

    /// Runs cycles until `shutdown` resolves or `max_cycles` is reached,
    /// then hands the daemon back.
    ///
    /// Each cycle runs on tokio's blocking pool; `shutdown` is only polled
    /// during the inter-cycle sleep, so a cycle always runs to completion.
    pub async fn run<S, F>(self, shutdown: S, mut on_cycle: F) -> Result<Self, DaemonError>
    where
        S: Future<Output = ()>,
        F: FnMut(&Daemon, &CycleReport),
    {
        tokio::pin!(shutdown);
        let interval = self.config.interval;
        let max_cycles = self.config.max_cycles;
        let mut daemon = self;

        loop {
            let (returned, report) = tokio::task::spawn_blocking(move || {
                let mut d = daemon;
                let report = d.run_cycle();
                (d, report)
            })
            .await
            .map_err(|e| DaemonError::Worker(e.to_string()))?;
            daemon = returned;
            on_cycle(&daemon, &report);

            if max_cycles.is_some_and(|max| daemon.cycles >= max) {
                tracing::info!(cycles = daemon.cycles, "cycle limit reached");
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    tracing::info!(cycles = daemon.cycles, "shutdown requested");
                    break;
                }
            }
        }
        Ok(daemon)
    }
}

// ── Startup ────────────────────────────────────────────────────

fn seed_registry(
    config: &DaemonConfig,
    max_cores: u32,
    controller: &dyn KernelCoreController,
) -> Result<CoreStateRegistry, DaemonError> {
    let min_active = config.thresholds.min_active;
    let managed = (1..max_cores).map(CoreId::new);

    let registry = match (config.init, config.dry_run) {
        (InitMode::AllActive, true) => CoreStateRegistry::all_active(max_cores, min_active)?,
        (InitMode::AllActive, false) => {
            let online: Vec<CoreId> = managed
                .filter(|&core| match controller.set_online(core, true) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(core = %core, error = %e, "cannot bring core online at startup");
                        false
                    }
                })
                .collect();
            CoreStateRegistry::from_online(max_cores, min_active, online)?
        }
        (InitMode::FromKernel, _) => {
            let online: Vec<CoreId> = managed
                .filter(|&core| {
                    controller.is_online(core).unwrap_or_else(|e| {
                        tracing::warn!(core = %core, error = %e, "cannot read core state, assuming offline");
                        false
                    })
                })
                .collect();
            CoreStateRegistry::from_online(max_cores, min_active, online)?
        }
    };
    Ok(registry)
}
