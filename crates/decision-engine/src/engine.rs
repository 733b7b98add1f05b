// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The decision engine: decide, then apply with commit-after-success.
//!
//! # Apply Order
//!
//! ```text
//! 1. stage the registry move on a copy   → InvariantViolation aborts, no write
//! 2. set_online(core, …)                 → failure aborts, registry untouched
//! 3. commit the staged registry
//! 4. set_governor(…, AllCores)           → failure is a warning only
//! ```

use crate::selector::CoreSelector;
use crate::thresholds::{Signals, Thresholds, Verdict};
use crate::{DecisionError, LeastUtilized, Transition, TransitionOutcome};
use core_registry::CoreStateRegistry;
use kernel_control::{GovernorScope, KernelCoreController};
use power_monitor::MetricsSnapshot;

/// Turns snapshots into at most one core transition per cycle.
pub struct DecisionEngine {
    thresholds: Thresholds,
    selector: Box<dyn CoreSelector>,
    dry_run: bool,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(Thresholds::default(), Box::new(LeastUtilized::new()))
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("thresholds", &self.thresholds)
            .field("selector", &self.selector.name())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl DecisionEngine {
    pub fn new(thresholds: Thresholds, selector: Box<dyn CoreSelector>) -> Self {
        Self {
            thresholds,
            selector,
            dry_run: false,
        }
    }

    /// In dry-run mode transitions are decided and logged but never applied.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn selector_name(&self) -> &str {
        self.selector.name()
    }

    /// Chooses this cycle's transition. Pure.
    pub fn decide(&self, snapshot: &MetricsSnapshot, registry: &CoreStateRegistry) -> Transition {
        let signals = Signals::from(snapshot);
        let verdict = self.thresholds.evaluate(
            signals,
            registry.active_count(),
            registry.offline_count(),
        );
        tracing::debug!(
            load = signals.load_percent,
            irq = signals.irq_count,
            ipc = signals.ipc,
            active = registry.active_count(),
            offline = registry.offline_count(),
            ?verdict,
            "policy evaluated"
        );

        match verdict {
            Verdict::ScaleDown => self
                .selector
                .select_deactivate(snapshot, registry)
                .map_or(Transition::Hold, Transition::Deactivate),
            Verdict::ScaleUp => self
                .selector
                .select_activate(snapshot, registry)
                .map_or(Transition::Hold, Transition::Activate),
            Verdict::Hold => Transition::Hold,
        }
    }

    /// Applies `transition` through `controller` and commits it to `registry`.
    ///
    /// On error the registry is unchanged.
    pub fn apply(
        &self,
        transition: Transition,
        registry: &mut CoreStateRegistry,
        controller: &dyn KernelCoreController,
    ) -> Result<TransitionOutcome, DecisionError> {
        let (core, direction) = match (transition.core(), transition.direction()) {
            (Some(core), Some(direction)) => (core, direction),
            _ => return Ok(TransitionOutcome::uncommitted(transition)),
        };

        let mut staged = registry.clone();
        let changed = if direction.online() {
            staged.activate(core)?
        } else {
            staged.deactivate(core)?
        };
        if !changed {
            tracing::debug!(%transition, "registry already in target state");
            return Ok(TransitionOutcome::uncommitted(transition));
        }

        if self.dry_run {
            tracing::info!(%transition, "dry run: transition not applied");
            return Ok(TransitionOutcome::uncommitted(transition));
        }

        if let Err(source) = controller.set_online(core, direction.online()) {
            tracing::error!(core = %core, %direction, error = %source, "core transition rejected");
            return Err(DecisionError::CoreTransitionFailed {
                core,
                direction,
                source,
            });
        }
        *registry = staged;
        tracing::info!(
            %transition,
            active = registry.active_count(),
            offline = registry.offline_count(),
            "core transition applied"
        );

        let governor = direction.governor();
        let governor_warning = match controller.set_governor(governor, GovernorScope::AllCores) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(%governor, error = %e, "governor switch failed, core move kept");
                Some(e.to_string())
            }
        };

        Ok(TransitionOutcome {
            transition,
            committed: true,
            governor: Some(governor),
            governor_warning,
        })
    }

    /// Decides and applies one transition.
    pub fn step(
        &self,
        snapshot: &MetricsSnapshot,
        registry: &mut CoreStateRegistry,
        controller: &dyn KernelCoreController,
    ) -> Result<TransitionOutcome, DecisionError> {
        let transition = self.decide(snapshot, registry);
        self.apply(transition, registry, controller)
    }
}
