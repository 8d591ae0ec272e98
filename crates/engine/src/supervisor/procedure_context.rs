// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch grouping of procedures.
//!
//! A procedure context is an object registry plus an ordered list of
//! procedures; it is itself a procedure, so it can appear as a supervisor
//! entry or be registered under an id and referenced. Its entries run
//! sequentially; `cancel` stops the sequence and forwards to whichever
//! procedure is currently running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

use gantry_core::{BoxError, Initializable, Object, ObjectRegistry, Procedure};

use crate::error::EngineError;
use crate::supervisor::registry::ProcessRegistry;

#[derive(Clone)]
enum Entry {
    Owned(Arc<dyn Object>),
    Referenced(Arc<dyn Object>),
}

impl Entry {
    fn object(&self) -> &Arc<dyn Object> {
        match self {
            Entry::Owned(object) | Entry::Referenced(object) => object,
        }
    }
}

pub struct ProcedureContext {
    weak: Weak<ProcedureContext>,
    objects: Arc<ObjectRegistry>,
    registry: Arc<ProcessRegistry>,
    entries: Mutex<Vec<Entry>>,
    current: Mutex<Option<Arc<dyn Object>>>,
    cancel_requested: AtomicBool,
    initialized: AtomicBool,
}

impl ProcedureContext {
    pub fn new(registry: Arc<ProcessRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            objects: ObjectRegistry::new(),
            registry,
            entries: Mutex::new(Vec::new()),
            current: Mutex::new(None),
            cancel_requested: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn objects(&self) -> &Arc<ObjectRegistry> {
        &self.objects
    }

    pub fn add_procedure(&self, procedure: Arc<dyn Object>) -> Result<(), EngineError> {
        if procedure.as_procedure().is_none() {
            return Err(EngineError::NotAProcedure("<owned>".to_string()));
        }
        self.entries.lock().push(Entry::Owned(procedure));
        Ok(())
    }

    pub fn add_procedure_ref(&self, ref_id: &str) -> Result<(), EngineError> {
        let object = self
            .objects
            .find_object(ref_id)
            .ok_or_else(|| EngineError::ObjectNotFound(ref_id.to_string()))?;
        if object.as_procedure().is_none() {
            return Err(EngineError::NotAProcedure(ref_id.to_string()));
        }
        self.entries.lock().push(Entry::Referenced(object));
        Ok(())
    }

    pub fn initialize(self: &Arc<Self>) -> Result<(), BoxError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.objects.initialize()?;
        let entries = self.entries.lock().clone();
        for entry in &entries {
            if let Entry::Owned(object) = entry {
                if let Some(initializable) = object.as_initializable() {
                    initializable.initialize(&self.objects)?;
                }
            }
        }
        Ok(())
    }

    pub fn dump_tree(&self, depth: usize) {
        let indent = "|   ".repeat(depth);
        info!("{indent}+-> Procedure context");
        self.objects.dump_tree(depth + 1);
        let entries = self.entries.lock().clone();
        let indent = "|   ".repeat(depth + 1);
        for entry in &entries {
            match entry {
                Entry::Owned(_) => info!("{indent}+-> Procedure"),
                Entry::Referenced(_) => info!("{indent}+-> Procedure (reference)"),
            }
        }
    }
}

impl Procedure for ProcedureContext {
    /// Run the entries in order, stopping between entries once `cancel`
    /// has been requested.
    fn run(&self, ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        let me = self.weak.upgrade().ok_or_else(|| BoxError::from("context has been dropped"))?;
        let proc_handle: Arc<dyn Procedure> = me;
        self.registry.register(proc_handle.clone());

        let entries = self.entries.lock().clone();
        let mut result = Ok(());
        for entry in &entries {
            if self.cancel_requested.load(Ordering::SeqCst) {
                debug!("procedure context cancelled between entries");
                break;
            }
            *self.current.lock() = Some(Arc::clone(entry.object()));
            let run_result = match entry.object().as_procedure() {
                Some(procedure) => procedure.run(ctx),
                None => Ok(()),
            };
            *self.current.lock() = None;
            if let Err(err) = run_result {
                result = Err(err);
                break;
            }
        }

        self.registry.unregister(&proc_handle);
        self.cancel_requested.store(false, Ordering::SeqCst);
        result
    }

    fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
        let current = self.current.lock().clone();
        if let Some(object) = current {
            if let Some(procedure) = object.as_procedure() {
                procedure.cancel();
            }
        }
    }
}

impl Object for ProcedureContext {
    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }

    fn as_procedure(&self) -> Option<&dyn Procedure> {
        Some(self)
    }
}

impl Initializable for ProcedureContext {
    fn initialize(&self, _owner: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        match self.weak.upgrade() {
            Some(this) => this.initialize(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "procedure_context_tests.rs"]
mod tests;
