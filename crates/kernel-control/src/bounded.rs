// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Deadline enforcement for kernel operations.
//!
//! A hotplug write can block for a long time (the kernel migrates every
//! task and interrupt off the core first), and a wedged driver can block
//! it forever. [`Bounded`] runs each call on a short-lived worker thread
//! and stops waiting after the deadline. A timed-out worker is detached;
//! the write it was performing may still land later, which is why the
//! caller treats a timeout exactly like a rejected write.
//!
//! At most one worker exists per wrapper. While an abandoned worker is still
//! blocked in the kernel, further calls fail at once with
//! [`WriteError::Worker`] instead of piling up more stuck threads.

use crate::{Governor, GovernorScope, KernelCoreController, WriteError};
use core_registry::CoreId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Wraps a controller so that no call waits longer than `timeout`.
#[derive(Debug)]
pub struct Bounded<C> {
    inner: Arc<C>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the worker finishes, panics included.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C> Bounded<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the wrapped controller.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: KernelCoreController + 'static> Bounded<C> {
    fn run<T, F>(&self, operation: String, f: F) -> Result<T, WriteError>
    where
        T: Send + 'static,
        F: FnOnce(&C) -> Result<T, WriteError> + Send + 'static,
    {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::warn!(%operation, "previous kernel operation still running, skipped");
            return Err(WriteError::Worker {
                operation,
                detail: "a previous kernel operation is still running".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let guard = InFlight(Arc::clone(&self.in_flight));
        std::thread::Builder::new()
            .name("coregov-kernel-op".to_string())
            .spawn(move || {
                let result = f(&inner);
                // Cleared before the send so the caller's next call never
                // sees a finished worker as busy.
                drop(guard);
                let _ = tx.send(result);
            })
            .map_err(|e| WriteError::Worker {
                operation: operation.clone(),
                detail: e.to_string(),
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::error!(%operation, timeout = ?self.timeout, "kernel operation abandoned");
                Err(WriteError::Timeout {
                    operation,
                    timeout: self.timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(WriteError::Worker {
                operation,
                detail: "worker exited without a result".to_string(),
            }),
        }
    }
}

impl<C: KernelCoreController + 'static> KernelCoreController for Bounded<C> {
    fn set_online(&self, core: CoreId, online: bool) -> Result<(), WriteError> {
        self.run(format!("set_online({core}, {online})"), move |c| {
            c.set_online(core, online)
        })
    }

    fn set_governor(&self, governor: Governor, scope: GovernorScope) -> Result<(), WriteError> {
        self.run(format!("set_governor({governor}, {scope})"), move |c| {
            c.set_governor(governor, scope)
        })
    }

    fn is_online(&self, core: CoreId) -> Result<bool, WriteError> {
        self.run(format!("is_online({core})"), move |c| c.is_online(core))
    }

    fn current_governor(&self, core: CoreId) -> Result<Governor, WriteError> {
        self.run(format!("current_governor({core})"), move |c| {
            c.current_governor(core)
        })
    }
}
