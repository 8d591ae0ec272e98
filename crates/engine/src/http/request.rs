// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-request state threaded through the dispatch tree.

use std::sync::Arc;

use gantry_core::ObjectRegistry;
use gantry_transport::{Connection, HttpRequest};

use crate::http::context::HttpContext;

/// Carries one request through `accept`.
///
/// The path is rewritten while endpoint entries descend and restored when
/// they decline. The two context pointers track the nearest enclosing
/// context so the failure path can resolve error documents and response
/// headers without re-walking the tree.
pub struct RequestContext<'c> {
    request: HttpRequest,
    connection: &'c mut dyn Connection,
    path: String,
    objects: Arc<ObjectRegistry>,
    headers_context: Option<Arc<HttpContext>>,
    error_context: Option<Arc<HttpContext>>,
}

impl<'c> RequestContext<'c> {
    pub fn new(request: HttpRequest, connection: &'c mut dyn Connection) -> Self {
        let path = request.path.clone();
        Self {
            request,
            connection,
            path,
            objects: ObjectRegistry::new(),
            headers_context: None,
            error_context: None,
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Current (possibly endpoint-rewritten) request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Registry for objects that live for this request only.
    pub fn objects(&self) -> &Arc<ObjectRegistry> {
        &self.objects
    }

    pub fn connection(&mut self) -> &mut dyn Connection {
        self.connection
    }

    pub(crate) fn enter_context(&mut self, context: &Arc<HttpContext>) {
        self.headers_context = Some(Arc::clone(context));
        self.error_context = Some(Arc::clone(context));
    }

    pub fn headers_context(&self) -> Option<&Arc<HttpContext>> {
        self.headers_context.as_ref()
    }

    pub fn error_context(&self) -> Option<&Arc<HttpContext>> {
        self.error_context.as_ref()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
