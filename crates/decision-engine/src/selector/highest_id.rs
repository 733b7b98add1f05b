// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Highest-id core selection.
//!
//! Ignores per-core load entirely: cores are parked from the top of the
//! range down and brought back from the bottom up. Predictable, and useful
//! on hosts where per-core utilisation is unavailable.

use crate::selector::CoreSelector;
use core_registry::{CoreId, CoreStateRegistry};
use power_monitor::MetricsSnapshot;

/// Deactivates the highest-numbered active core.
#[derive(Debug, Clone, Default)]
pub struct HighestId;

impl HighestId {
    pub fn new() -> Self {
        Self
    }
}

impl CoreSelector for HighestId {
    fn name(&self) -> &str {
        "highest-id"
    }

    fn select_deactivate(
        &self,
        _snapshot: &MetricsSnapshot,
        registry: &CoreStateRegistry,
    ) -> Option<CoreId> {
        registry.active().iter().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_highest_down_lowest_up() {
        let mut registry = CoreStateRegistry::all_active(6, 1).unwrap();
        registry.deactivate(CoreId::new(5)).unwrap();
        registry.deactivate(CoreId::new(3)).unwrap();
        let snap = MetricsSnapshot::new(0.0, 0, 0.0, BTreeMap::new());

        let selector = HighestId::new();
        assert_eq!(selector.select_deactivate(&snap, &registry), Some(CoreId::new(4)));
        assert_eq!(selector.select_activate(&snap, &registry), Some(CoreId::new(3)));
    }

    #[test]
    fn test_nothing_offline() {
        let registry = CoreStateRegistry::all_active(3, 1).unwrap();
        let snap = MetricsSnapshot::new(0.0, 0, 0.0, BTreeMap::new());
        assert_eq!(HighestId::new().select_activate(&snap, &registry), None);
    }
}
