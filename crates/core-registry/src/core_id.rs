// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Logical CPU identifiers.

use std::fmt;

/// A logical CPU index as the kernel numbers it (`cpu0`, `cpu1`, …).
///
/// Ordering is the numeric order of the index, which gives every core set a
/// total order and keeps core selection reproducible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct CoreId(u32);

impl CoreId {
    /// The boot CPU. Its `online` file is absent or unreliable on most
    /// platforms, so the governor never transitions it.
    pub const RESERVED: CoreId = CoreId(0);

    /// Creates a core identifier from a raw index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns `true` for core 0.
    pub const fn is_reserved(self) -> bool {
        self.0 == Self::RESERVED.0
    }

    /// Returns this core's sysfs directory name (`"cpu3"`).
    pub fn sysfs_name(self) -> String {
        format!("cpu{}", self.0)
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CoreId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}
