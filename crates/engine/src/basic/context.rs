// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composable basic-protocol dispatch node.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::info;

use gantry_core::{downcast_object, BoxError, Initializable, Object, ObjectRegistry};
use gantry_transport::Input;

use crate::applications::Applications;
use crate::basic::{BasicRequestContext, BasicRequestHandler};
use crate::error::EngineError;
use crate::failure::HandlerError;

/// A single element of a basic context's ordered dispatch list.
#[derive(Clone)]
pub enum BasicEntry {
    Procedure(Arc<dyn Object>),
    ProcedureRef(Arc<dyn Object>),
    Context(Arc<BasicContext>),
    ContextRef(Arc<BasicContext>),
    RequestHandler(Arc<dyn BasicRequestHandler>),
    Applications(Arc<Applications>),
}

struct State {
    entries: Vec<BasicEntry>,
    initialized: bool,
}

/// An object registry plus an ordered entry list; no matching predicate
/// of its own, message filtering happens in the handlers.
pub struct BasicContext {
    weak: Weak<BasicContext>,
    objects: Arc<ObjectRegistry>,
    state: RwLock<State>,
}

impl BasicContext {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            objects: ObjectRegistry::new(),
            state: RwLock::new(State { entries: Vec::new(), initialized: false }),
        })
    }

    pub fn objects(&self) -> &Arc<ObjectRegistry> {
        &self.objects
    }

    pub fn add_procedure(&self, procedure: Arc<dyn Object>) -> Result<(), EngineError> {
        if procedure.as_procedure().is_none() {
            return Err(EngineError::NotAProcedure("<owned>".to_string()));
        }
        self.state.write().entries.push(BasicEntry::Procedure(procedure));
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
        self.state.write().entries.push(BasicEntry::ProcedureRef(object));
        Ok(())
    }

    /// Append an owned child context; with `inherit_objects` it resolves
    /// object lookups through this node.
    pub fn add_child(self: &Arc<Self>, child: Arc<BasicContext>, inherit_objects: bool) {
        if inherit_objects {
            child.objects.set_parent(&self.objects);
        }
        self.state.write().entries.push(BasicEntry::Context(child));
    }

    /// Register a named child as an object only; it dispatches when a
    /// reference entry names it.
    pub fn register_child(
        self: &Arc<Self>,
        id: &str,
        child: Arc<BasicContext>,
        inherit_objects: bool,
    ) -> Result<(), EngineError> {
        if inherit_objects {
            child.objects.set_parent(&self.objects);
        }
        self.objects.add_object(id, child as Arc<dyn Object>)?;
        Ok(())
    }

    pub fn add_context_ref(&self, ref_id: &str) -> Result<(), EngineError> {
        let object = self
            .objects
            .find_object(ref_id)
            .ok_or_else(|| EngineError::ObjectNotFound(ref_id.to_string()))?;
        let context = downcast_object::<BasicContext>(object)
            .ok_or_else(|| EngineError::NotAContext(ref_id.to_string()))?;
        self.state.write().entries.push(BasicEntry::ContextRef(context));
        Ok(())
    }

    pub fn add_request_handler(&self, handler: Arc<dyn BasicRequestHandler>) {
        self.state.write().entries.push(BasicEntry::RequestHandler(handler));
    }

    pub fn add_applications_ref(&self, ref_id: &str) -> Result<(), EngineError> {
        let applications = self
            .objects
            .find_object_as::<Applications>(ref_id)
            .ok_or_else(|| EngineError::ObjectNotFound(ref_id.to_string()))?;
        self.state.write().entries.push(BasicEntry::Applications(applications));
        Ok(())
    }

    /// Union of the notifier sets of every entry.
    pub fn notifiers(&self) -> BTreeSet<String> {
        let entries = self.state.read().entries.clone();
        let mut notifiers = BTreeSet::new();
        for entry in &entries {
            match entry {
                BasicEntry::Context(context) | BasicEntry::ContextRef(context) => {
                    notifiers.extend(context.notifiers());
                }
                BasicEntry::RequestHandler(handler) => notifiers.extend(handler.notifiers()),
                BasicEntry::Applications(applications) => {
                    notifiers.extend(applications.basic_notifiers());
                }
                BasicEntry::Procedure(_) | BasicEntry::ProcedureRef(_) => {}
            }
        }
        notifiers
    }

    /// Freeze the node and run the one-time setup pass. Runs once.
    pub fn initialize(self: &Arc<Self>) -> Result<(), BoxError> {
        {
            let mut state = self.state.write();
            if state.initialized {
                return Ok(());
            }
            state.initialized = true;
        }

        self.objects.initialize()?;

        let entries = self.state.read().entries.clone();
        for entry in &entries {
            match entry {
                BasicEntry::Procedure(object) => {
                    if let Some(initializable) = object.as_initializable() {
                        initializable.initialize(&self.objects)?;
                    }
                }
                BasicEntry::Context(context) => context.initialize()?,
                BasicEntry::RequestHandler(handler) => handler.initialize(&self.objects)?,
                BasicEntry::ProcedureRef(_)
                | BasicEntry::ContextRef(_)
                | BasicEntry::Applications(_) => {}
            }
        }
        Ok(())
    }

    /// Dispatch one message: entries in insertion order, first non-empty
    /// input wins. Procedure entries run for their side effects only.
    pub fn accept(&self, ctx: &mut BasicRequestContext) -> Result<Input, HandlerError> {
        let entries = self.state.read().entries.clone();
        for entry in &entries {
            let input = match entry {
                BasicEntry::Procedure(object) | BasicEntry::ProcedureRef(object) => {
                    if let Some(procedure) = object.as_procedure() {
                        procedure.run(ctx.objects()).map_err(HandlerError::Other)?;
                    }
                    Input::empty()
                }
                BasicEntry::Context(context) | BasicEntry::ContextRef(context) => {
                    context.accept(ctx)?
                }
                BasicEntry::RequestHandler(handler) => handler.accept(ctx)?,
                BasicEntry::Applications(applications) => applications.dispatch_basic(ctx, None)?,
            };
            if !input.is_empty() {
                return Ok(input);
            }
        }
        Ok(Input::empty())
    }

    pub fn dump_tree(&self, depth: usize) {
        let indent = "|   ".repeat(depth);
        info!("{indent}+-> Basic context");
        self.objects.dump_tree(depth + 1);
        let entries = self.state.read().entries.clone();
        for entry in &entries {
            let indent = "|   ".repeat(depth + 1);
            match entry {
                BasicEntry::Procedure(_) => info!("{indent}+-> Procedure"),
                BasicEntry::ProcedureRef(_) => info!("{indent}+-> Procedure (reference)"),
                BasicEntry::Context(context) => context.dump_tree(depth + 1),
                BasicEntry::ContextRef(_) => info!("{indent}+-> Context (reference)"),
                BasicEntry::RequestHandler(_) => info!("{indent}+-> BasicHandler"),
                BasicEntry::Applications(_) => info!("{indent}+-> Applications (reference)"),
            }
        }
    }
}

impl Object for BasicContext {
    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }
}

impl Initializable for BasicContext {
    fn initialize(&self, _owner: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        match self.weak.upgrade() {
            Some(this) => this.initialize(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
