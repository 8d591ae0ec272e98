// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded pool of reusable objects with per-item lifetime.
//!
//! Items are handed out as [`Pooled`] RAII handles; dropping the handle
//! returns the item to the pool. A bounded pool blocks `get` callers while
//! `max_objects` items are circulating. When a lifetime is configured, a
//! sweeper thread destroys idle items that outlive it; expired items are
//! never handed out.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};

/// Which idle item `get` takes when several are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Take the item that has been idle the longest.
    Fifo,
    /// Take the most recently released item.
    Lifo,
}

/// Capability probe consulted when an item returns to the pool. Dirty
/// items are destroyed instead of being reused.
pub trait PoolItem: Send + 'static {
    fn is_dirty(&self) -> bool {
        false
    }
}

struct IdleItem<T> {
    value: T,
    created_at: Instant,
}

struct State<T> {
    idle: VecDeque<IdleItem<T>>,
    circulating: usize,
    shutdown: bool,
}

struct Shared<T, C: Clock> {
    state: Mutex<State<T>>,
    /// Wakes blocked `get` callers.
    waiters: Condvar,
    /// Wakes the sweeper thread to recompute its deadline.
    sweeper: Condvar,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    max_objects: usize,
    lifetime: Duration,
    reset_lifetime_on_get: bool,
    reset_lifetime_on_release: bool,
    clock: C,
}

impl<T: PoolItem, C: Clock> Shared<T, C> {
    fn expired(&self, created_at: Instant, now: Instant) -> bool {
        !self.lifetime.is_zero() && created_at + self.lifetime <= now
    }

    fn release(&self, value: T, created_at: Instant) {
        let mut state = self.state.lock();
        let now = self.clock.now();

        if state.shutdown {
            debug!("destroying released item: pool is shutting down");
        } else if self.expired(created_at, now) {
            debug!("destroying released item: lifetime expired");
        } else if value.is_dirty() {
            debug!("destroying released item: dirty");
        } else {
            let created_at = if self.reset_lifetime_on_release { now } else { created_at };
            state.idle.push_back(IdleItem { value, created_at });
        }

        state.circulating -= 1;
        self.waiters.notify_one();
        if !self.lifetime.is_zero() {
            self.sweeper.notify_one();
        }
    }

    fn sweep(shared: &Arc<Self>) {
        let mut state = shared.state.lock();
        loop {
            let now = shared.clock.now();
            if state.shutdown {
                state.idle.clear();
            } else {
                let before = state.idle.len();
                state.idle.retain(|item| !shared.expired(item.created_at, now));
                if state.idle.len() != before {
                    debug!(dropped = before - state.idle.len(), "swept expired idle items");
                }
            }
            shared.waiters.notify_all();

            if state.shutdown && state.circulating == 0 {
                break;
            }

            let now = shared.clock.now();
            let next_deadline =
                state.idle.iter().map(|item| item.created_at + shared.lifetime).min();
            match next_deadline {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(now);
                    if wait.is_zero() {
                        continue;
                    }
                    let _ = shared.sweeper.wait_for(&mut state, wait);
                }
                None => shared.sweeper.wait(&mut state),
            }
        }
        trace!("pool sweeper finished");
    }
}

/// Handle to a pooled item. Dropping it releases the item back to the pool.
pub struct Pooled<T: PoolItem, C: Clock = SystemClock> {
    value: Option<T>,
    created_at: Instant,
    shared: Arc<Shared<T, C>>,
}

impl<T: PoolItem, C: Clock> Deref for Pooled<T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        // `value` is Some for the whole life of the handle
        match &self.value {
            Some(value) => value,
            None => unreachable!(),
        }
    }
}

impl<T: PoolItem, C: Clock> DerefMut for Pooled<T, C> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!(),
        }
    }
}

impl<T: PoolItem, C: Clock> Drop for Pooled<T, C> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.shared.release(value, self.created_at);
        }
    }
}

/// See the module docs.
pub struct ObjectPool<T: PoolItem, C: Clock = SystemClock> {
    shared: Arc<Shared<T, C>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<T: PoolItem> ObjectPool<T, SystemClock> {
    /// Create a pool.
    ///
    /// `max_objects` of 0 means unbounded; `lifetime` of zero means items
    /// never expire. The reset flags control whether an item's lifetime is
    /// restarted when it is taken out of or released back into the pool.
    pub fn new(
        factory: impl Fn() -> T + Send + Sync + 'static,
        max_objects: usize,
        lifetime: Duration,
        reset_lifetime_on_get: bool,
        reset_lifetime_on_release: bool,
    ) -> Self {
        Self::with_clock(
            factory,
            max_objects,
            lifetime,
            reset_lifetime_on_get,
            reset_lifetime_on_release,
            SystemClock,
        )
    }
}

impl<T: PoolItem, C: Clock> ObjectPool<T, C> {
    pub fn with_clock(
        factory: impl Fn() -> T + Send + Sync + 'static,
        max_objects: usize,
        lifetime: Duration,
        reset_lifetime_on_get: bool,
        reset_lifetime_on_release: bool,
        clock: C,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State { idle: VecDeque::new(), circulating: 0, shutdown: false }),
            waiters: Condvar::new(),
            sweeper: Condvar::new(),
            factory: Box::new(factory),
            max_objects,
            lifetime,
            reset_lifetime_on_get,
            reset_lifetime_on_release,
            clock,
        });

        // Items without a lifetime never expire, so no sweeper is needed.
        let sweeper = if lifetime.is_zero() {
            None
        } else {
            let shared = Arc::clone(&shared);
            Some(std::thread::spawn(move || Shared::sweep(&shared)))
        };

        Self { shared, sweeper: Mutex::new(sweeper) }
    }

    /// Acquire an item, blocking while the pool is at capacity.
    ///
    /// A `timeout` of zero waits indefinitely; otherwise `None` is returned
    /// when the deadline passes. `None` is also returned once the pool is
    /// shutting down.
    pub fn get(&self, timeout: Duration, strategy: Strategy) -> Option<Pooled<T, C>> {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        if shared.max_objects > 0 {
            if timeout.is_zero() {
                while !(state.shutdown || state.circulating < shared.max_objects) {
                    shared.waiters.wait(&mut state);
                }
            } else {
                let deadline = Instant::now() + timeout;
                while !(state.shutdown || state.circulating < shared.max_objects) {
                    if shared.waiters.wait_until(&mut state, deadline).timed_out() {
                        trace!("pool get timed out");
                        return None;
                    }
                }
            }
        }

        if state.shutdown {
            return None;
        }

        state.circulating += 1;
        let now = shared.clock.now();

        // Pop by strategy; expired idle items are destroyed on the spot and
        // never handed out.
        let item = loop {
            let candidate = match strategy {
                Strategy::Fifo => state.idle.pop_front(),
                Strategy::Lifo => state.idle.pop_back(),
            };
            match candidate {
                Some(item) if shared.expired(item.created_at, now) => {
                    debug!("discarding expired idle item during get");
                }
                other => break other,
            }
        };

        let (value, created_at) = match item {
            Some(item) => {
                let created_at =
                    if shared.reset_lifetime_on_get { now } else { item.created_at };
                (item.value, created_at)
            }
            None => ((shared.factory)(), now),
        };

        Some(Pooled { value: Some(value), created_at, shared: Arc::clone(shared) })
    }

    /// Put the pool into shutdown: idle items are destroyed, blocked `get`
    /// callers return `None` and released items are no longer retained.
    /// Idempotent; also triggered by dropping the pool.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        state.shutdown = true;
        if self.sweeper.lock().is_some() {
            self.shared.sweeper.notify_one();
        } else {
            state.idle.clear();
        }
        self.shared.waiters.notify_all();
    }

    #[cfg(test)]
    fn counts(&self) -> (usize, usize) {
        let state = self.shared.state.lock();
        (state.idle.len(), state.circulating)
    }
}

impl<T: PoolItem, C: Clock> Drop for ObjectPool<T, C> {
    fn drop(&mut self) {
        self.shutdown();

        if let Some(handle) = self.sweeper.lock().take() {
            // The sweeper drops the idle items, wakes all waiters and waits
            // for circulating items to come home before it exits.
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
