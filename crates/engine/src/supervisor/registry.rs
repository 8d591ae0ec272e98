// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Running-procedure registry shared by the supervisor and the servers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

use gantry_core::Procedure;

/// Pointer-identity key for a procedure handle; stable for the life of
/// the `Arc`.
fn key(procedure: &Arc<dyn Procedure>) -> usize {
    Arc::as_ptr(procedure) as *const () as usize
}

/// Set of currently running procedures, with a condition for "the set
/// became empty" that `Main::run` blocks on.
#[derive(Default)]
pub struct ProcessRegistry {
    running: Mutex<Vec<Arc<dyn Procedure>>>,
    empty: Condvar,
}

impl ProcessRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, procedure: Arc<dyn Procedure>) {
        let mut running = self.running.lock();
        trace!(count = running.len() + 1, "procedure registered");
        running.push(procedure);
    }

    pub fn unregister(&self, procedure: &Arc<dyn Procedure>) {
        let mut running = self.running.lock();
        if running.is_empty() {
            warn!("no procedure is running, but one reported shutdown");
            return;
        }
        let target = key(procedure);
        running.retain(|candidate| key(candidate) != target);
        trace!(count = running.len(), "procedure unregistered");
        if running.is_empty() {
            self.empty.notify_all();
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().len()
    }

    /// Snapshot of the running set, for cancellation sweeps.
    pub fn snapshot(&self) -> Vec<Arc<dyn Procedure>> {
        self.running.lock().clone()
    }

    pub fn is_registered(&self, procedure: &Arc<dyn Procedure>) -> bool {
        let target = key(procedure);
        self.running.lock().iter().any(|candidate| key(candidate) == target)
    }

    /// Block until the running set is empty.
    pub fn wait_idle(&self) {
        let mut running = self.running.lock();
        while !running.is_empty() {
            self.empty.wait(&mut running);
        }
    }

    /// Block until the running set is empty or `timeout` passes; returns
    /// whether the set is empty.
    pub fn wait_idle_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut running = self.running.lock();
        while !running.is_empty() {
            if self.empty.wait_until(&mut running, deadline).timed_out() {
                return running.is_empty();
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
