// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`CoreSelector`] trait and selector implementations.

pub mod highest_id;
pub mod least_utilized;

use core_registry::{CoreId, CoreStateRegistry};
use power_monitor::MetricsSnapshot;

/// Picks which core a transition acts on.
///
/// Selectors are pure: the same snapshot and registry always yield the same
/// core, so a cycle can be replayed in tests.
pub trait CoreSelector: Send + Sync {
    /// Human-readable name of this selector.
    fn name(&self) -> &str;

    /// Chooses an active core to take offline, or `None` if there is none.
    fn select_deactivate(
        &self,
        snapshot: &MetricsSnapshot,
        registry: &CoreStateRegistry,
    ) -> Option<CoreId>;

    /// Chooses an offline core to bring online, or `None` if there is none.
    ///
    /// The default picks the lowest-numbered offline core.
    fn select_activate(
        &self,
        _snapshot: &MetricsSnapshot,
        registry: &CoreStateRegistry,
    ) -> Option<CoreId> {
        registry.offline().iter().next().copied()
    }
}
