// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object capability model for the registry.
//!
//! Everything stored in an [`ObjectRegistry`](crate::ObjectRegistry) is an
//! opaque `Arc<dyn Object>`. The engine never inspects concrete types on the
//! request path; instead it asks an object for the capabilities it cares
//! about through the probe methods below.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::registry::ObjectRegistry;

/// Boxed error used at contract seams where callers cannot know the
/// concrete error type of an implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An opaque value participating in the object registry.
///
/// The two capability probes default to `None`; implementations override
/// the ones they satisfy.
pub trait Object: Any + Send + Sync {
    /// View this object as [`Initializable`], if it is one.
    fn as_initializable(&self) -> Option<&dyn Initializable> {
        None
    }

    /// View this object as a [`Procedure`], if it is one.
    fn as_procedure(&self) -> Option<&dyn Procedure> {
        None
    }
}

/// Objects that need a one-time setup pass after the context tree is built
/// and before any request is served.
pub trait Initializable {
    fn initialize(&self, owner: &Arc<ObjectRegistry>) -> Result<(), BoxError>;
}

/// A long-lived or batch unit of work managed by the supervisor.
///
/// `run` is expected to block until completion or cancellation; `cancel`
/// requests termination and must never block or fail. Calling `cancel` on a
/// procedure that already returned is a no-op.
pub trait Procedure: Send + Sync {
    fn run(&self, ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError>;
    fn cancel(&self);
}

impl std::fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object").finish_non_exhaustive()
    }
}

/// Downcast a registry object to its concrete type.
pub fn downcast_object<T: Object>(object: Arc<dyn Object>) -> Option<Arc<T>> {
    let any: Arc<dyn Any + Send + Sync> = object;
    any.downcast::<T>().ok()
}

/// A mutable single-value object.
///
/// Used by the supervisor to publish the configured return code under the
/// `return-code` id when a run fails.
pub struct Value<T>(Mutex<T>);

impl<T: Clone + Send + 'static> Value<T> {
    pub fn new(value: T) -> Self {
        Self(Mutex::new(value))
    }

    pub fn get(&self) -> T {
        self.0.lock().clone()
    }

    pub fn set(&self, value: T) {
        *self.0.lock() = value;
    }
}

impl<T: Clone + Send + 'static> Object for Value<T> {}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
