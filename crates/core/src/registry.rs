// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named object registry with parent-chained lookup.
//!
//! A registry node owns objects and exposes references. Every owned object
//! automatically gets a reference under the same id; additional references
//! may point at objects owned elsewhere (typically up the parent chain), so
//! a child context can expose parent-owned objects under local names
//! without duplicating state.
//!
//! The registry is write-once: mutation is only valid while the context
//! tree is being built. After [`ObjectRegistry::initialize`] has run, the
//! tree is read-only and lookups are taken concurrently without further
//! coordination.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use thiserror::Error;
use tracing::trace;

use crate::object::{downcast_object, BoxError, Object};

/// Errors from registry mutation.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("object id must not be empty")]
    EmptyId,

    #[error("an object or reference with id '{0}' is already registered")]
    DuplicateId(String),

    #[error("no object found with ref-id '{0}'")]
    NotFound(String),
}

#[derive(Default)]
struct Inner {
    /// Owned objects; their lifetime is the registry's lifetime.
    objects: BTreeMap<String, Arc<dyn Object>>,
    /// Every id visible in this registry, owned or referenced.
    refs: BTreeMap<String, Arc<dyn Object>>,
    parent: Weak<ObjectRegistry>,
    initialized: bool,
}

/// A node in the object graph. See the module docs.
#[derive(Default)]
pub struct ObjectRegistry {
    inner: RwLock<Inner>,
}

impl ObjectRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Link this registry into a parent chain. Lookups that miss locally
    /// continue in the parent.
    pub fn set_parent(&self, parent: &Arc<ObjectRegistry>) {
        self.inner.write().parent = Arc::downgrade(parent);
    }

    /// Store an owned object and register a reference with the same id.
    pub fn add_object(&self, id: &str, object: Arc<dyn Object>) -> Result<(), RegistryError> {
        trace!(id, "adding object");
        let mut inner = self.inner.write();
        Self::insert_ref(&mut inner, id, Arc::clone(&object))?;
        inner.objects.insert(id.to_string(), object);
        Ok(())
    }

    /// Register a reference to an object owned elsewhere.
    pub fn add_reference(&self, id: &str, target: Arc<dyn Object>) -> Result<(), RegistryError> {
        trace!(id, "adding object reference");
        let mut inner = self.inner.write();
        Self::insert_ref(&mut inner, id, target)
    }

    /// Register a reference by resolving `ref_id` through this registry and
    /// its parent chain.
    pub fn add_reference_to(&self, id: &str, ref_id: &str) -> Result<(), RegistryError> {
        let target = self
            .find_object(ref_id)
            .ok_or_else(|| RegistryError::NotFound(ref_id.to_string()))?;
        self.add_reference(id, target)
    }

    /// Look up an object: local references first, then the parent chain.
    pub fn find_object(&self, id: &str) -> Option<Arc<dyn Object>> {
        let parent = {
            let inner = self.inner.read();
            if let Some(object) = inner.refs.get(id) {
                return Some(Arc::clone(object));
            }
            inner.parent.clone()
        };
        parent.upgrade()?.find_object(id)
    }

    /// Typed lookup; `None` when the id is unknown or the object is of a
    /// different concrete type.
    pub fn find_object_as<T: Object>(&self, id: &str) -> Option<Arc<T>> {
        self.find_object(id).and_then(downcast_object::<T>)
    }

    /// Ids visible in this registry (owned and referenced), in order.
    pub fn ids(&self) -> Vec<String> {
        self.inner.read().refs.keys().cloned().collect()
    }

    /// Whether `id` names an owned object (as opposed to a reference).
    pub fn owns(&self, id: &str) -> bool {
        self.inner.read().objects.contains_key(id)
    }

    /// Run the one-time setup pass over every owned object, in id order.
    ///
    /// Repeated calls are no-ops; the first call freezes the registry.
    pub fn initialize(self: &Arc<Self>) -> Result<(), BoxError> {
        let owned: Vec<Arc<dyn Object>> = {
            let mut inner = self.inner.write();
            if inner.initialized {
                return Ok(());
            }
            inner.initialized = true;
            inner.objects.values().cloned().collect()
        };

        for object in owned {
            if let Some(initializable) = object.as_initializable() {
                initializable.initialize(self)?;
            }
        }
        Ok(())
    }

    /// Log the visible ids of this registry at `depth` in a tree dump.
    pub fn dump_tree(&self, depth: usize) {
        let inner = self.inner.read();
        let indent = "|   ".repeat(depth);
        for id in inner.refs.keys() {
            let suffix = if inner.objects.contains_key(id) { "" } else { " (reference)" };
            tracing::info!("{indent}+-> Object: \"{id}\"{suffix}");
        }
    }

    fn insert_ref(inner: &mut Inner, id: &str, target: Arc<dyn Object>) -> Result<(), RegistryError> {
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if inner.refs.contains_key(id) {
            return Err(RegistryError::DuplicateId(id.to_string()));
        }
        inner.refs.insert(id.to_string(), target);
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
