// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Transitions and their outcomes.

use core_registry::CoreId;
use kernel_control::Governor;
use std::fmt;

/// The single action a cycle may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "core", rename_all = "kebab-case")]
pub enum Transition {
    Activate(CoreId),
    Deactivate(CoreId),
    Hold,
}

impl Transition {
    /// The core this transition acts on.
    pub fn core(&self) -> Option<CoreId> {
        match self {
            Self::Activate(core) | Self::Deactivate(core) => Some(*core),
            Self::Hold => None,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::Activate(_) => Some(Direction::Activate),
            Self::Deactivate(_) => Some(Direction::Deactivate),
            Self::Hold => None,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Self::Hold)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activate(core) => write!(f, "activate core {core}"),
            Self::Deactivate(core) => write!(f, "deactivate core {core}"),
            Self::Hold => f.write_str("hold"),
        }
    }
}

/// Which way a core moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Activate,
    Deactivate,
}

impl Direction {
    /// Value passed to `set_online`.
    pub fn online(self) -> bool {
        matches!(self, Self::Activate)
    }

    /// Governor selected after a move in this direction.
    pub fn governor(self) -> Governor {
        match self {
            Self::Activate => Governor::Performance,
            Self::Deactivate => Governor::Powersave,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
        })
    }
}

/// What happened when a transition was applied.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TransitionOutcome {
    pub transition: Transition,
    /// `true` once the kernel accepted the online write and the registry
    /// was updated. Always `false` for `Hold` and in dry-run mode.
    pub committed: bool,
    /// Governor that was requested after the move, if any.
    pub governor: Option<Governor>,
    /// Set when the governor write failed. The core move still stands.
    pub governor_warning: Option<String>,
}

impl TransitionOutcome {
    pub(crate) fn uncommitted(transition: Transition) -> Self {
        Self {
            transition,
            committed: false,
            governor: None,
            governor_warning: None,
        }
    }

    /// `true` if a core was taken offline this cycle.
    pub fn deactivated(&self) -> bool {
        self.committed && matches!(self.transition, Transition::Deactivate(_))
    }
}
