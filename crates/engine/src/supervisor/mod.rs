// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Main supervisor context.
//!
//! The root of the object graph. It owns the top-level entries
//! (procedures, procedure contexts, HTTP and basic servers), the TLS
//! certificate map, and the running-procedure registry; `run` drives the
//! whole lifecycle from initialization to signal-driven shutdown.

pub mod procedure_context;
pub mod registry;
pub mod signals;

pub use procedure_context::ProcedureContext;
pub use registry::ProcessRegistry;
pub use signals::{block_signals, StopSignal};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use gantry_core::{BoxError, Object, ObjectRegistry, Procedure, Value};

use crate::basic::BasicServer;
use crate::error::EngineError;
use crate::failure::{Failure, HandlerError};
use crate::http::HttpServer;
use crate::supervisor::signals::SignalLoop;

/// TLS material for one hostname.
#[derive(Debug, Clone)]
pub struct Certificate {
    pub key: Vec<u8>,
    pub certificate: Vec<u8>,
}

/// Certificate map keyed by hostname.
pub type Certificates = BTreeMap<String, Certificate>;

/// Behaviour switches of the supervisor, from the configuration settings.
#[derive(Debug, Clone)]
pub struct MainOptions {
    /// Signals that trigger cancellation. Empty set: no signal thread.
    pub stop_signals: BTreeSet<StopSignal>,
    /// After this many cancel requests without quiescence, the next one
    /// force-terminates the process. `None`: never force-terminate.
    pub terminate_counter: Option<u32>,
    /// Swallow run failures instead of returning them.
    pub catch_failure: bool,
    /// Render run failures to stderr.
    pub dump_failure: bool,
    /// Published as the `return-code` object when a run fails.
    pub failure_return_code: Option<i32>,
    /// Dump the object/context tree after initialization.
    pub verbose: bool,
}

impl Default for MainOptions {
    fn default() -> Self {
        Self {
            stop_signals: BTreeSet::new(),
            terminate_counter: None,
            catch_failure: false,
            dump_failure: true,
            failure_return_code: None,
            verbose: false,
        }
    }
}

/// A top-level supervisor entry, started in declaration order.
#[derive(Clone)]
pub enum MainEntry {
    Procedure(Arc<dyn Object>),
    ProcedureRef(Arc<dyn Object>),
    ProcedureContext(Arc<ProcedureContext>),
    ProcedureContextRef(Arc<ProcedureContext>),
    HttpServer(Arc<HttpServer>),
    BasicServer(Arc<BasicServer>),
}

impl std::fmt::Debug for Main {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Main").finish_non_exhaustive()
    }
}

/// See the module docs.
pub struct Main {
    weak: Weak<Main>,
    objects: Arc<ObjectRegistry>,
    registry: Arc<ProcessRegistry>,
    certificates: RwLock<Certificates>,
    entries: Mutex<Vec<MainEntry>>,
    options: MainOptions,
    terminate_counter: Mutex<Option<u32>>,
    cancel_requested: AtomicBool,
    initialized: AtomicBool,
}

impl Main {
    pub fn new(options: MainOptions) -> Arc<Self> {
        let terminate_counter = options.terminate_counter;
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            objects: ObjectRegistry::new(),
            registry: ProcessRegistry::new(),
            certificates: RwLock::new(BTreeMap::new()),
            entries: Mutex::new(Vec::new()),
            options,
            terminate_counter: Mutex::new(terminate_counter),
            cancel_requested: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
        })
    }

    /// Root object registry.
    pub fn objects(&self) -> &Arc<ObjectRegistry> {
        &self.objects
    }

    /// Running-procedure registry shared with the servers.
    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &MainOptions {
        &self.options
    }

    pub fn add_certificate(
        &self,
        hostname: impl Into<String>,
        key: Vec<u8>,
        certificate: Vec<u8>,
    ) {
        self.certificates.write().insert(hostname.into(), Certificate { key, certificate });
    }

    /// Load key and certificate files eagerly; missing files fail here,
    /// long before a TLS handshake would.
    pub fn add_certificate_files(
        &self,
        hostname: &str,
        key_file: &Path,
        certificate_file: &Path,
    ) -> Result<(), EngineError> {
        let key = std::fs::read(key_file).map_err(|source| EngineError::CertificateIo {
            kind: "key",
            path: key_file.to_path_buf(),
            source,
        })?;
        let certificate =
            std::fs::read(certificate_file).map_err(|source| EngineError::CertificateIo {
                kind: "certificate",
                path: certificate_file.to_path_buf(),
                source,
            })?;
        self.add_certificate(hostname, key, certificate);
        Ok(())
    }

    pub fn certificates(&self) -> Certificates {
        self.certificates.read().clone()
    }

    pub fn add_procedure(&self, procedure: Arc<dyn Object>) -> Result<(), EngineError> {
        if procedure.as_procedure().is_none() {
            return Err(EngineError::NotAProcedure("<owned>".to_string()));
        }
        self.entries.lock().push(MainEntry::Procedure(procedure));
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
        self.entries.lock().push(MainEntry::ProcedureRef(object));
        Ok(())
    }

    pub fn add_procedure_context(&self, context: Arc<ProcedureContext>) {
        self.entries.lock().push(MainEntry::ProcedureContext(context));
    }

    pub fn add_procedure_context_ref(&self, ref_id: &str) -> Result<(), EngineError> {
        let context = self
            .objects
            .find_object_as::<ProcedureContext>(ref_id)
            .ok_or_else(|| EngineError::ObjectNotFound(ref_id.to_string()))?;
        self.entries.lock().push(MainEntry::ProcedureContextRef(context));
        Ok(())
    }

    pub fn add_http_server(&self, server: Arc<HttpServer>) {
        self.entries.lock().push(MainEntry::HttpServer(server));
    }

    pub fn add_basic_server(&self, server: Arc<BasicServer>) {
        self.entries.lock().push(MainEntry::BasicServer(server));
    }

    /// Deep-initialize the object graph and every entry. Runs once.
    pub fn initialize(self: &Arc<Self>) -> Result<(), BoxError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("initializing objects");
        self.objects.initialize()?;

        let entries = self.entries.lock().clone();
        let certificates = self.certificates();
        for entry in &entries {
            match entry {
                MainEntry::Procedure(object) => {
                    if let Some(initializable) = object.as_initializable() {
                        initializable.initialize(&self.objects)?;
                    }
                }
                MainEntry::ProcedureContext(context) => context.initialize()?,
                MainEntry::HttpServer(server) => server.initialize(&certificates)?,
                MainEntry::BasicServer(server) => server.initialize()?,
                MainEntry::ProcedureRef(_) | MainEntry::ProcedureContextRef(_) => {}
            }
        }
        info!("initialization done");

        if self.options.verbose {
            self.dump_tree(0);
        }
        Ok(())
    }

    pub fn dump_tree(&self, depth: usize) {
        let indent = "|   ".repeat(depth);
        info!("{indent}+-> Main context");
        self.objects.dump_tree(depth + 1);
        let entries = self.entries.lock().clone();
        for entry in &entries {
            let indent = "|   ".repeat(depth + 1);
            match entry {
                MainEntry::Procedure(_) => info!("{indent}+-> Procedure"),
                MainEntry::ProcedureRef(_) => info!("{indent}+-> Procedure (reference)"),
                MainEntry::ProcedureContext(context) => context.dump_tree(depth + 1),
                MainEntry::ProcedureContextRef(_) => {
                    info!("{indent}+-> Procedure context (reference)");
                }
                MainEntry::HttpServer(server) => server.dump_tree(depth + 1),
                MainEntry::BasicServer(server) => server.dump_tree(depth + 1),
            }
        }
    }

    fn run_entries(self: &Arc<Self>, ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        self.initialize()?;

        debug!("starting all entries");
        let entries = self.entries.lock().clone();
        for entry in &entries {
            if self.cancel_requested.load(Ordering::SeqCst) {
                debug!("cancellation requested; not starting further entries");
                break;
            }
            match entry {
                MainEntry::Procedure(object) | MainEntry::ProcedureRef(object) => {
                    if let Some(procedure) = object.as_procedure() {
                        procedure.run(ctx)?;
                    }
                }
                MainEntry::ProcedureContext(context)
                | MainEntry::ProcedureContextRef(context) => {
                    (context.clone() as Arc<dyn Procedure>).run(ctx)?;
                }
                MainEntry::HttpServer(server) => {
                    debug!("starting http server");
                    (server.clone() as Arc<dyn Procedure>).run(ctx)?;
                }
                MainEntry::BasicServer(server) => {
                    debug!("starting basic server");
                    (server.clone() as Arc<dyn Procedure>).run(ctx)?;
                }
            }
        }
        Ok(())
    }

    /// Publish the configured return code and render the failure per the
    /// options; returns it back unless `catch_failure` swallows it.
    fn handle_failure(&self, ctx: &Arc<ObjectRegistry>, err: BoxError) -> Result<(), BoxError> {
        if let Some(code) = self.options.failure_return_code {
            match ctx.find_object_as::<Value<i32>>("return-code") {
                Some(value) => value.set(code),
                None => {
                    if let Err(add_err) = ctx.add_object("return-code", Arc::new(Value::new(code)))
                    {
                        warn!("publishing return-code failed: {add_err}");
                    }
                }
            }
        }

        let failure = Failure::new(HandlerError::Other(err));
        failure.report().log();
        if self.options.dump_failure {
            failure.report().dump_stderr();
        }

        if self.options.catch_failure {
            Ok(())
        } else {
            match failure.error {
                HandlerError::Other(err) => Err(err),
                other => Err(Box::new(other)),
            }
        }
    }
}

impl Procedure for Main {
    /// Lifecycle per the state machine: install the signal loop, deep
    /// initialize, start the entries in order, block until the running
    /// set drains, then tear the signal loop down and reset the
    /// cancellation flag.
    fn run(&self, ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        let me = self.weak.upgrade().ok_or_else(|| BoxError::from("context has been dropped"))?;

        // Install before initialization so a signal can terminate a hung
        // startup.
        let cancel_target = Arc::clone(&me);
        let signal_loop = SignalLoop::start(&self.options.stop_signals, Arc::clone(&self.registry), move || {
            cancel_target.cancel();
        });

        let proc_handle: Arc<dyn Procedure> = me.clone();
        self.registry.register(proc_handle.clone());

        let result = me.run_entries(ctx);
        self.registry.unregister(&proc_handle);

        let result = match result {
            Ok(()) => {
                if self.registry.running_count() == 0 {
                    debug!("no procedure is running");
                } else {
                    debug!("all entries started; waiting for procedures to finish");
                    self.registry.wait_idle();
                }
                Ok(())
            }
            Err(err) => self.handle_failure(ctx, err),
        };

        if let Some(signal_loop) = signal_loop {
            signal_loop.stop();
        }
        self.cancel_requested.store(false, Ordering::SeqCst);
        result
    }

    /// Cancellation sweep. Safe to call from any thread; never blocks on
    /// procedure shutdown. The terminate counter guards against a wedged
    /// procedure blocking shutdown forever.
    fn cancel(&self) {
        {
            let mut counter = self.terminate_counter.lock();
            match *counter {
                Some(0) => {
                    warn!("terminate counter exhausted; aborting the process");
                    std::process::abort();
                }
                Some(remaining) => *counter = Some(remaining - 1),
                None => {}
            }
        }

        let me = match self.weak.upgrade() {
            Some(me) => me as Arc<dyn Procedure>,
            None => return,
        };
        let me_key = Arc::as_ptr(&me) as *const () as usize;

        let snapshot = self.registry.snapshot();
        info!(count = snapshot.len(), "stopping procedures");
        for procedure in &snapshot {
            let proc_key = Arc::as_ptr(procedure) as *const () as usize;
            if proc_key == me_key {
                // The entry loop checks this flag between entries.
                self.cancel_requested.store(true, Ordering::SeqCst);
            } else {
                procedure.cancel();
            }
        }
        debug!("stop initiated for all procedures");
    }
}

impl Object for Main {
    fn as_procedure(&self) -> Option<&dyn Procedure> {
        Some(self)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
