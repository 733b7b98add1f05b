// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Least-utilised core selection.
//!
//! Parks the active core doing the least work, so the tasks it has to
//! migrate away are as few as possible.
//!
//! # Ranking
//! - Lower utilisation ranks first.
//! - A core with no sample in the snapshot ranks last.
//! - Ties go to the higher-numbered core, which keeps low-numbered cores
//!   (where most IRQ affinity defaults point) online.
//!
//! Activation uses the trait default: lowest-numbered offline core.

use crate::selector::CoreSelector;
use core_registry::{CoreId, CoreStateRegistry};
use power_monitor::MetricsSnapshot;

/// Deactivates the least-utilised active core.
#[derive(Debug, Clone, Default)]
pub struct LeastUtilized;

impl LeastUtilized {
    pub fn new() -> Self {
        Self
    }
}

impl CoreSelector for LeastUtilized {
    fn name(&self) -> &str {
        "least-utilized"
    }

    fn select_deactivate(
        &self,
        snapshot: &MetricsSnapshot,
        registry: &CoreStateRegistry,
    ) -> Option<CoreId> {
        let rank = |core: CoreId| snapshot.utilization_of(core).unwrap_or(f64::INFINITY);
        registry
            .active()
            .iter()
            .copied()
            .min_by(|a, b| rank(*a).total_cmp(&rank(*b)).then_with(|| b.cmp(a)))
    }
}
