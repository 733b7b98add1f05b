// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`MetricsSource`] trait and its procfs/sysfs implementation.

use crate::cpu::{self, StatSample, Utilisation};
use crate::interrupts;
use crate::sysfs::{CPU_SYSFS_ROOT, PROC_ROOT};
use crate::{AcquisitionError, CoreSample, IpcEstimator, MetricsSnapshot};
use core_registry::CoreId;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A provider of per-cycle load signals.
///
/// Each reader may fail independently. [`MetricsSource::capture`] turns the
/// four reads into a [`MetricsSnapshot`], substituting the documented
/// default for any field whose read failed, so a broken counter never
/// aborts a cycle.
pub trait MetricsSource {
    /// Aggregate CPU utilisation in percent.
    fn read_load(&mut self) -> Result<f64, AcquisitionError>;

    /// Cumulative interrupt count attributed to `interface`.
    fn read_irq_count(&mut self, interface: &str) -> Result<u64, AcquisitionError>;

    /// Instructions-per-cycle estimate.
    fn read_ipc(&mut self) -> Result<f64, AcquisitionError>;

    /// Utilisation, online flag and frequency of each managed core.
    fn read_per_core(&mut self) -> Result<BTreeMap<CoreId, CoreSample>, AcquisitionError>;

    /// Reads every signal and assembles a snapshot, degrading failed fields.
    fn capture(&mut self, interface: &str) -> MetricsSnapshot {
        let cpu_load_percent = self.read_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cpu load unavailable, using 0%");
            0.0
        });
        let irq_count = self.read_irq_count(interface).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "irq count unavailable, using 0");
            0
        });
        let ipc = self.read_ipc().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ipc unavailable, using 0.0");
            0.0
        });
        let per_core = self.read_per_core().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "per-core metrics unavailable");
            BTreeMap::new()
        });
        MetricsSnapshot::new(cpu_load_percent, irq_count, ipc, per_core)
    }
}

/// Reads metrics from the live kernel.
///
/// Utilisation is a delta between consecutive `/proc/stat` samples. The
/// first read takes a priming sample and waits `sample_interval`; after
/// that, each [`read_load`](MetricsSource::read_load) measures the interval
/// since the previous call, so the control loop's own period becomes the
/// sampling window. The per-core read reuses the delta taken by the
/// preceding load read.
#[derive(Debug)]
pub struct ProcfsSource {
    proc_root: PathBuf,
    cpu_root: PathBuf,
    max_cores: u32,
    sample_interval: Duration,
    command_timeout: Duration,
    ipc: IpcEstimator,
    previous: Option<StatSample>,
    pending: Option<Utilisation>,
}

impl ProcfsSource {
    /// Creates a source reading from `/proc` and `/sys/devices/system/cpu`.
    pub fn new(max_cores: u32, ipc: IpcEstimator) -> Self {
        Self::with_roots(PROC_ROOT, CPU_SYSFS_ROOT, max_cores, ipc)
    }

    /// Creates a source reading from alternative roots (fixture trees).
    pub fn with_roots(
        proc_root: impl Into<PathBuf>,
        cpu_root: impl Into<PathBuf>,
        max_cores: u32,
        ipc: IpcEstimator,
    ) -> Self {
        Self {
            proc_root: proc_root.into(),
            cpu_root: cpu_root.into(),
            max_cores,
            sample_interval: Duration::from_secs(1),
            command_timeout: Duration::from_secs(2),
            ipc,
            previous: None,
            pending: None,
        }
    }

    /// Sets the priming interval used before the first utilisation reading.
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Sets the bound on external sampling commands.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    fn sample_utilisation(&mut self) -> Result<Utilisation, AcquisitionError> {
        let earlier = match self.previous.take() {
            Some(prev) => prev,
            None => {
                let prime = StatSample::read(&self.proc_root)?;
                std::thread::sleep(self.sample_interval);
                prime
            }
        };
        let now = StatSample::read(&self.proc_root)?;
        let utilisation = now.utilisation_since(&earlier);
        self.previous = Some(now);
        Ok(utilisation)
    }

    fn core_sample(&self, core: CoreId, utilisation: Option<&Utilisation>) -> CoreSample {
        let online = cpu::read_core_online(&self.cpu_root, core).unwrap_or_else(|e| {
            tracing::warn!(core = %core, error = %e, "cannot read online state, reporting offline");
            false
        });
        let frequency_khz = if online {
            cpu::read_core_frequency_khz(&self.cpu_root, core).unwrap_or(0)
        } else {
            0
        };
        let utilization_percent = utilisation
            .and_then(|u| u.per_core_percent.get(&core).copied())
            .unwrap_or(0.0);
        CoreSample {
            utilization_percent,
            online,
            frequency_khz,
        }
    }
}

impl MetricsSource for ProcfsSource {
    fn read_load(&mut self) -> Result<f64, AcquisitionError> {
        let utilisation = self.sample_utilisation()?;
        let load = utilisation.aggregate_percent;
        self.pending = Some(utilisation);
        Ok(load)
    }

    fn read_irq_count(&mut self, interface: &str) -> Result<u64, AcquisitionError> {
        interrupts::read_irq_count(&self.proc_root, interface)
    }

    fn read_ipc(&mut self) -> Result<f64, AcquisitionError> {
        self.ipc.estimate(self.command_timeout)
    }

    fn read_per_core(&mut self) -> Result<BTreeMap<CoreId, CoreSample>, AcquisitionError> {
        let utilisation = match self.pending.take() {
            Some(u) => Some(u),
            None => self
                .sample_utilisation()
                .map_err(|e| tracing::warn!(error = %e, "per-core utilisation unavailable"))
                .ok(),
        };
        Ok((1..self.max_cores)
            .map(CoreId::new)
            .map(|core| (core, self.core_sample(core, utilisation.as_ref())))
            .collect())
    }
}
