// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the decision engine.

use crate::Direction;
use core_registry::{CoreId, InvariantViolation};
use kernel_control::WriteError;

/// Errors that can occur while applying a transition.
///
/// In every case the registry is left exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// The kernel rejected (or did not confirm in time) the online write.
    #[error("failed to {direction} core {core}: {source}")]
    CoreTransitionFailed {
        core: CoreId,
        direction: Direction,
        #[source]
        source: WriteError,
    },

    /// The registry refused the move before any kernel write was made.
    #[error("registry rejected transition: {0}")]
    Invariant(#[from] InvariantViolation),

    /// A threshold set failed validation.
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),
}
