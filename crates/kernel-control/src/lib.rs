// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # kernel-control
//!
//! The privileged side of the governor: everything that changes kernel
//! state goes through this crate.
//!
//! # Key Components
//!
//! - [`KernelCoreController`] — core hotplug and cpufreq governor writes.
//!   [`SysfsController`] implements it on `/sys/devices/system/cpu`.
//! - [`Bounded`] — wraps any controller so that no call outlives a
//!   deadline; a hung hotplug write surfaces as [`WriteError::Timeout`].
//! - [`ProcessTable`] — process enumeration plus `sched_setaffinity(2)`,
//!   used to move work off cores that were taken offline.
//!   [`ProcfsProcessTable`] implements it on `/proc`.
//!
//! # Example
//! ```no_run
//! use core_registry::CoreId;
//! use kernel_control::{Bounded, Governor, GovernorScope, KernelCoreController, SysfsController};
//! use std::time::Duration;
//!
//! let ctl = Bounded::new(SysfsController::new(8), Duration::from_secs(2));
//! ctl.set_online(CoreId::new(7), false).unwrap();
//! ctl.set_governor(Governor::Powersave, GovernorScope::AllCores).unwrap();
//! ```

mod affinity;
mod bounded;
mod controller;
mod error;
mod governor;

pub use affinity::{ProcessInfo, ProcessTable, ProcfsProcessTable};
pub use bounded::Bounded;
pub use controller::{KernelCoreController, SysfsController};
pub use error::{AffinityError, WriteError};
pub use governor::{Governor, GovernorScope};
