// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # core-registry
//!
//! The bookkeeping at the centre of the governor: which logical CPUs are
//! believed online and eligible for load, and which have been parked.
//!
//! # Key Components
//!
//! - [`CoreId`] — a logical CPU index. Core `0` is [`CoreId::RESERVED`] and
//!   is never transitioned.
//! - [`CoreStateRegistry`] — the `active` / `offline` partition of every
//!   managed core. All mutation goes through [`CoreStateRegistry::activate`]
//!   and [`CoreStateRegistry::deactivate`], which reject anything that would
//!   break the partition or the minimum-active guarantee.
//! - [`cpulist`] — parsing and formatting of the kernel's cpu-list syntax
//!   (`"0-3,6"`) used by sysfs and `/proc/<pid>/status`.
//!
//! # Invariants
//!
//! ```text
//! active ∩ offline = ∅
//! active ∪ offline = { 1, 2, …, max_cores - 1 }
//! |active| ≥ min_active
//! ```
//!
//! # Example
//! ```
//! use core_registry::{CoreId, CoreStateRegistry};
//!
//! let mut registry = CoreStateRegistry::all_active(4, 1).unwrap();
//! assert_eq!(registry.active_count(), 3);
//!
//! registry.deactivate(CoreId::new(3)).unwrap();
//! assert!(registry.is_offline(CoreId::new(3)));
//!
//! // Core 0 is never managed.
//! assert!(registry.deactivate(CoreId::RESERVED).is_err());
//! ```

mod core_id;
pub mod cpulist;
mod error;
mod registry;

pub use core_id::CoreId;
pub use error::InvariantViolation;
pub use registry::{CoreStateRegistry, RegistrySnapshot};
