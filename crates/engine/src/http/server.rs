// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP/HTTPS server wrapper: binds a dispatch tree to a transport
//! listener and takes part in the supervisor's procedure lifecycle.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use tracing::{debug, error, info};

use gantry_core::{BoxError, Object, ObjectRegistry, Procedure};
use gantry_transport::{
    Connection, HttpDispatcher, HttpListener, HttpRequest, Input, TlsHost,
};

use crate::error::EngineError;
use crate::failure::{Failure, HandlerError, StatusError};
use crate::http::context::HttpContext;
use crate::http::failure::send_failure;
use crate::http::request::RequestContext;
use crate::supervisor::{Certificates, ProcessRegistry};

/// See the module docs. Created with [`HttpServer::new`]; the root context
/// is configured through [`HttpServer::context`] before `initialize`.
pub struct HttpServer {
    weak: Weak<HttpServer>,
    listener: Arc<dyn HttpListener>,
    root: Arc<HttpContext>,
    registry: Arc<ProcessRegistry>,
    tls: bool,
}

impl HttpServer {
    pub fn new(
        listener: Arc<dyn HttpListener>,
        tls: bool,
        registry: Arc<ProcessRegistry>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            listener,
            root: HttpContext::new(),
            registry,
            tls,
        })
    }

    /// Root dispatch context.
    pub fn context(&self) -> &Arc<HttpContext> {
        &self.root
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Install TLS material (HTTPS only) and freeze the dispatch tree.
    pub fn initialize(&self, certificates: &Certificates) -> Result<(), EngineError> {
        if self.tls {
            if certificates.is_empty() {
                return Err(EngineError::MissingCertificate);
            }
            let hosts: Vec<TlsHost> = certificates
                .iter()
                .map(|(hostname, certificate)| TlsHost {
                    hostname: hostname.clone(),
                    key: certificate.key.clone(),
                    certificate: certificate.certificate.clone(),
                })
                .collect();
            self.listener
                .set_tls_hosts(hosts)
                .map_err(|err| EngineError::Setup(err.to_string()))?;
        }

        self.root.initialize().map_err(|err| EngineError::Setup(err.to_string()))
    }

    pub fn dump_tree(&self, depth: usize) {
        let indent = "|   ".repeat(depth);
        if self.tls {
            info!("{indent}+-> HTTPS server");
        } else {
            info!("{indent}+-> HTTP server");
        }
        self.root.dump_tree(depth + 1);
    }

    fn me(&self) -> Result<Arc<HttpServer>, BoxError> {
        self.weak.upgrade().ok_or_else(|| BoxError::from("server has been dropped"))
    }
}

impl Procedure for HttpServer {
    /// Register with the supervisor and start the transport. The listener
    /// owns its accept threads, so this returns once listening has begun;
    /// the registry entry is removed when the transport reports release.
    fn run(&self, _ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        let me = self.me()?;
        let proc_handle: Arc<dyn Procedure> = me.clone();
        self.registry.register(proc_handle.clone());

        let registry = Arc::clone(&self.registry);
        let dispatcher: Arc<dyn HttpDispatcher> = me;
        let result = self.listener.listen(
            dispatcher,
            Box::new(move || {
                debug!("http listener released");
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
        debug!("releasing http listener");
        self.listener.release();
    }
}

impl HttpDispatcher for HttpServer {
    /// Per-request entry point driven by the transport. Dispatch failures
    /// and panics are rendered as structured responses; the transport
    /// never sees a truncated connection.
    fn dispatch(&self, request: HttpRequest, connection: &mut dyn Connection) -> Input {
        let mut ctx = RequestContext::new(request, connection);
        ctx.enter_context(&self.root);

        let outcome = catch_unwind(AssertUnwindSafe(|| self.root.accept(&mut ctx)));
        let handler_error = match outcome {
            Ok(Ok(input)) if !input.is_empty() => return input,
            Ok(Ok(_)) => HandlerError::from(StatusError::new(404)),
            Ok(Err(err)) => err,
            Err(payload) => {
                if let Some(message) = panic_message(&payload) {
                    error!("request handler panicked: {message}");
                } else {
                    error!("request handler panicked");
                }
                HandlerError::Unknown
            }
        };

        let failure = Failure::new(handler_error);
        failure.report().log();
        send_failure(&failure, &mut ctx);
        Input::empty()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> Option<String> {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return Some((*message).to_string());
    }
    payload.downcast_ref::<String>().cloned()
}

// Servers can be registered in a context under an id and referenced as
// procedures from entry lists.
impl Object for HttpServer {
    fn as_procedure(&self) -> Option<&dyn Procedure> {
        Some(self)
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
