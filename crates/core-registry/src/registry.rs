// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The authoritative active/offline partition.
//!
//! Membership reflects the last *successfully applied* transition. The
//! registry does not talk to the kernel; callers commit a move only after
//! the corresponding privileged write has succeeded.

use crate::{CoreId, InvariantViolation};
use std::collections::BTreeSet;

/// Partition of the managed cores (`1..max_cores`) into `active` and
/// `offline`.
///
/// Not thread-safe: the control loop owns the registry and passes it by
/// reference into each cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStateRegistry {
    active: BTreeSet<CoreId>,
    offline: BTreeSet<CoreId>,
    max_cores: u32,
    min_active: usize,
}

/// An owned copy of the partition, suitable for reporting.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RegistrySnapshot {
    /// Cores believed online, ascending.
    pub active: Vec<CoreId>,
    /// Cores believed offline, ascending.
    pub offline: Vec<CoreId>,
}

impl CoreStateRegistry {
    /// Creates a registry with every managed core active and nothing offline.
    pub fn all_active(max_cores: u32, min_active: usize) -> Result<Self, InvariantViolation> {
        Self::from_online(max_cores, min_active, (1..max_cores).map(CoreId::new))
    }

    /// Creates a registry from the cores the kernel currently reports online.
    ///
    /// Core 0 and anything outside `1..max_cores` in `online` are ignored;
    /// every other managed core starts offline.
    pub fn from_online(
        max_cores: u32,
        min_active: usize,
        online: impl IntoIterator<Item = CoreId>,
    ) -> Result<Self, InvariantViolation> {
        let managed: BTreeSet<CoreId> = (1..max_cores).map(CoreId::new).collect();
        let active: BTreeSet<CoreId> = online
            .into_iter()
            .filter(|core| managed.contains(core))
            .collect();

        if active.len() < min_active {
            return Err(InvariantViolation::InsufficientCores {
                available: active.len(),
                min_active,
            });
        }

        let offline = managed.difference(&active).copied().collect();
        let registry = Self {
            active,
            offline,
            max_cores,
            min_active,
        };
        registry.debug_check();
        Ok(registry)
    }

    /// Moves `core` from `offline` to `active`.
    ///
    /// Returns `Ok(false)` if the core was already active (no change).
    pub fn activate(&mut self, core: CoreId) -> Result<bool, InvariantViolation> {
        self.check_managed(core)?;
        if self.active.contains(&core) {
            return Ok(false);
        }
        self.offline.remove(&core);
        self.active.insert(core);
        self.debug_check();
        tracing::debug!(core = %core, active = self.active.len(), "registry: core activated");
        Ok(true)
    }

    /// Moves `core` from `active` to `offline`.
    ///
    /// Returns `Ok(false)` if the core was already offline (no change).
    /// Rejects the move if it would leave fewer than `min_active` cores.
    pub fn deactivate(&mut self, core: CoreId) -> Result<bool, InvariantViolation> {
        self.check_managed(core)?;
        if self.offline.contains(&core) {
            return Ok(false);
        }
        if self.active.len() <= self.min_active {
            return Err(InvariantViolation::BelowMinimum {
                core,
                active: self.active.len(),
                min_active: self.min_active,
            });
        }
        self.active.remove(&core);
        self.offline.insert(core);
        self.debug_check();
        tracing::debug!(core = %core, active = self.active.len(), "registry: core deactivated");
        Ok(true)
    }

    /// Returns an owned copy of both sets.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            active: self.active.iter().copied().collect(),
            offline: self.offline.iter().copied().collect(),
        }
    }

    /// Cores believed online, ascending.
    pub fn active(&self) -> &BTreeSet<CoreId> {
        &self.active
    }

    /// Cores believed offline, ascending.
    pub fn offline(&self) -> &BTreeSet<CoreId> {
        &self.offline
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn offline_count(&self) -> usize {
        self.offline.len()
    }

    pub fn is_active(&self, core: CoreId) -> bool {
        self.active.contains(&core)
    }

    pub fn is_offline(&self, core: CoreId) -> bool {
        self.offline.contains(&core)
    }

    /// Returns `true` if one more core may be deactivated.
    pub fn can_deactivate(&self) -> bool {
        self.active.len() > self.min_active
    }

    /// Total logical CPUs, including the reserved core.
    pub fn max_cores(&self) -> u32 {
        self.max_cores
    }

    pub fn min_active(&self) -> usize {
        self.min_active
    }

    /// Every managed core, ascending (core 0 excluded).
    pub fn managed(&self) -> impl Iterator<Item = CoreId> {
        (1..self.max_cores).map(CoreId::new)
    }

    /// Verifies the partition invariants, returning a description of the
    /// first one that does not hold.
    pub fn check_invariants(&self) -> Result<(), String> {
        if let Some(core) = self.active.intersection(&self.offline).next() {
            return Err(format!("core {core} is both active and offline"));
        }
        let union: BTreeSet<CoreId> = self.active.union(&self.offline).copied().collect();
        let managed: BTreeSet<CoreId> = self.managed().collect();
        if union != managed {
            return Err(format!(
                "partition covers {} cores, expected {}",
                union.len(),
                managed.len()
            ));
        }
        if self.active.len() < self.min_active {
            return Err(format!(
                "{} active cores, minimum is {}",
                self.active.len(),
                self.min_active
            ));
        }
        Ok(())
    }

    fn check_managed(&self, core: CoreId) -> Result<(), InvariantViolation> {
        if core.is_reserved() {
            return Err(InvariantViolation::ReservedCore { core });
        }
        if core.index() >= self.max_cores {
            return Err(InvariantViolation::UnknownCore {
                core,
                max_cores: self.max_cores,
            });
        }
        Ok(())
    }

    fn debug_check(&self) {
        debug_assert!(
            self.check_invariants().is_ok(),
            "registry invariant broken: {:?}",
            self.check_invariants()
        );
    }
}
