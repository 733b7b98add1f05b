// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # decision-engine
//!
//! Turns one [`MetricsSnapshot`](power_monitor::MetricsSnapshot) into at
//! most one core transition and applies it.
//!
//! # Policy
//!
//! | Condition | Transition | Governor |
//! |---|---|---|
//! | load, IRQ and IPC all below threshold, more than `min_active` active | [`Transition::Deactivate`] | powersave |
//! | any signal at or above threshold, some core offline | [`Transition::Activate`] | performance |
//! | otherwise | [`Transition::Hold`] | unchanged |
//!
//! # Selectors
//!
//! Which core moves is decided by a [`CoreSelector`]:
//!
//! | Selector | Deactivates | Activates |
//! |---|---|---|
//! | [`LeastUtilized`] | lowest utilisation (ties → higher id) | lowest offline id |
//! | [`HighestId`] | highest active id | lowest offline id |
//!
//! # Example
//! ```no_run
//! use core_registry::CoreStateRegistry;
//! use decision_engine::DecisionEngine;
//! use kernel_control::SysfsController;
//! use power_monitor::{IpcEstimator, MetricsSource, ProcfsSource};
//!
//! let mut registry = CoreStateRegistry::all_active(8, 1).unwrap();
//! let mut source = ProcfsSource::new(8, IpcEstimator::default());
//! let controller = SysfsController::new(8);
//!
//! let snapshot = source.capture("eno1");
//! let outcome = DecisionEngine::default()
//!     .step(&snapshot, &mut registry, &controller)
//!     .unwrap();
//! println!("{}", outcome.transition);
//! ```

mod engine;
mod error;
pub mod selector;
pub mod thresholds;
mod transition;

pub use engine::DecisionEngine;
pub use error::DecisionError;
pub use selector::highest_id::HighestId;
pub use selector::least_utilized::LeastUtilized;
pub use selector::CoreSelector;
pub use thresholds::{
    Signals, Thresholds, Verdict, IPC_THRESHOLD, IRQ_THRESHOLD, LOAD_THRESHOLD, MIN_ACTIVE_CORES,
};
pub use transition::{Direction, Transition, TransitionOutcome};
