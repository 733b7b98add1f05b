// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for registry mutations.

use crate::CoreId;

/// A registry mutation was rejected because it would break the partition
/// or the minimum-active guarantee. The registry is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// Core 0 is reserved and never transitioned.
    #[error("core {core} is reserved and cannot be transitioned")]
    ReservedCore { core: CoreId },

    /// The core is outside the managed range `1..max_cores`.
    #[error("core {core} is not managed (managed cores: 1..{max_cores})")]
    UnknownCore { core: CoreId, max_cores: u32 },

    /// Deactivating would leave fewer than `min_active` cores online.
    #[error("cannot deactivate core {core}: {active} active, minimum is {min_active}")]
    BelowMinimum {
        core: CoreId,
        active: usize,
        min_active: usize,
    },

    /// The initial inventory cannot satisfy the minimum-active guarantee.
    #[error("only {available} managed cores could be active, minimum is {min_active}")]
    InsufficientCores { available: usize, min_active: usize },
}
