// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Basic server wrapper: binds a basic dispatch tree to a message
//! transport and takes part in the supervisor's procedure lifecycle.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tracing::{debug, error, info};

use gantry_core::{BoxError, Object, ObjectRegistry, Procedure};
use gantry_transport::{BasicDispatcher, BasicListener, BasicRequest, Input};

use crate::basic::context::BasicContext;
use crate::basic::BasicRequestContext;
use crate::error::EngineError;
use crate::failure::Failure;
use crate::supervisor::ProcessRegistry;

/// See the module docs.
pub struct BasicServer {
    weak: Weak<BasicServer>,
    listener: Arc<dyn BasicListener>,
    root: Arc<BasicContext>,
    registry: Arc<ProcessRegistry>,
}

impl BasicServer {
    pub fn new(listener: Arc<dyn BasicListener>, registry: Arc<ProcessRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            listener,
            root: BasicContext::new(),
            registry,
        })
    }

    /// Root dispatch context.
    pub fn context(&self) -> &Arc<BasicContext> {
        &self.root
    }

    pub fn initialize(&self) -> Result<(), EngineError> {
        self.root.initialize().map_err(|err| EngineError::Setup(err.to_string()))
    }

    pub fn dump_tree(&self, depth: usize) {
        let indent = "|   ".repeat(depth);
        info!("{indent}+-> Basic server");
        for notifier in self.root.notifiers() {
            info!("{indent}|   notifier \"{notifier}\"");
        }
        self.root.dump_tree(depth + 1);
    }

    fn me(&self) -> Result<Arc<BasicServer>, BoxError> {
        self.weak.upgrade().ok_or_else(|| BoxError::from("server has been dropped"))
    }
}

impl Procedure for BasicServer {
    /// Register with the supervisor and start the transport, advertising
    /// the aggregated notifier set so the transport can pre-filter
    /// subscriptions.
    fn run(&self, _ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        let me = self.me()?;
        let proc_handle: Arc<dyn Procedure> = me.clone();
        self.registry.register(proc_handle.clone());

        let registry = Arc::clone(&self.registry);
        let dispatcher: Arc<dyn BasicDispatcher> = me;
        let result = self.listener.listen(
            self.root.notifiers(),
            dispatcher,
            Box::new(move || {
                debug!("basic listener released");
                registry.unregister(&proc_handle);
            }),
        );

        if let Err(err) = result {
            let me = self.me()?;
            self.registry.unregister(&(me as Arc<dyn Procedure>));
            return Err(err);
        }
        Ok(())
    }

    fn cancel(&self) {
        debug!("releasing basic listener");
        self.listener.release();
    }
}

impl BasicDispatcher for BasicServer {
    /// Per-message entry point. The basic protocol has no response
    /// channel, so failures are logged and the message is dropped.
    fn dispatch(&self, request: BasicRequest) -> Input {
        let mut ctx = BasicRequestContext::new(request);
        match catch_unwind(AssertUnwindSafe(|| self.root.accept(&mut ctx))) {
            Ok(Ok(input)) => input,
            Ok(Err(err)) => {
                Failure::new(err).report().log();
                Input::empty()
            }
            Err(_) => {
                error!("basic handler panicked");
                Input::empty()
            }
        }
    }
}

impl Object for BasicServer {
    fn as_procedure(&self) -> Option<&dyn Procedure> {
        Some(self)
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
