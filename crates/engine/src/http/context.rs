// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composable HTTP dispatch node.
//!
//! One node type covers plain contexts, endpoints and hosts; the kind only
//! changes the matching predicate applied by the entry dispatcher. A node
//! is an object registry (for configuration sharing) plus an ordered entry
//! list (for dispatch) plus the response-shaping state that children
//! inherit: headers, error documents and the show-exception flags.
//!
//! Like the registry, nodes are write-once: all mutation happens while the
//! tree is built from configuration, `initialize` freezes it, and request
//! dispatch afterwards only reads.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::info;

use gantry_core::{downcast_object, BoxError, Initializable, Object, ObjectRegistry};
use gantry_transport::Input;

use crate::applications::Applications;
use crate::error::EngineError;
use crate::failure::HandlerError;
use crate::http::entry::HttpEntry;
use crate::http::request::RequestContext;
use crate::http::HttpRequestHandler;

/// Matching predicate of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextKind {
    /// Always matches.
    Plain,
    /// Matches a URL-path prefix and rewrites the path for descendants.
    Endpoint { path: String },
    /// Matches a virtual-host name pattern.
    Host { pattern: String },
}

/// How an error document's body is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentLanguage {
    /// Serve the document verbatim.
    Plain,
    /// Run the built-in interpolator over it. The interpolation grammar is
    /// outside the engine; the document is passed through unchanged here.
    BuiltinScript,
}

/// Response rule for one HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDocument {
    pub path: String,
    pub language: DocumentLanguage,
}

impl ErrorDocument {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), language: DocumentLanguage::Plain }
    }

    pub fn interpolated(path: impl Into<String>) -> Self {
        Self { path: path.into(), language: DocumentLanguage::BuiltinScript }
    }
}

struct State {
    parent: Weak<HttpContext>,
    entries: Vec<HttpEntry>,
    show_exception: Option<bool>,
    show_stacktrace: Option<bool>,
    inherit_error_documents: bool,
    error_documents: BTreeMap<u16, ErrorDocument>,
    headers: BTreeMap<String, String>,
    effective_headers: BTreeMap<String, String>,
    initialized: bool,
}

/// See the module docs.
pub struct HttpContext {
    weak: Weak<HttpContext>,
    kind: ContextKind,
    objects: Arc<ObjectRegistry>,
    state: RwLock<State>,
}

impl HttpContext {
    pub fn new() -> Arc<Self> {
        Self::with_kind(ContextKind::Plain)
    }

    pub fn endpoint(path: &str) -> Arc<Self> {
        Self::with_kind(ContextKind::Endpoint { path: normalize_path(path) })
    }

    pub fn host(pattern: impl Into<String>) -> Arc<Self> {
        Self::with_kind(ContextKind::Host { pattern: pattern.into() })
    }

    fn with_kind(kind: ContextKind) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            kind,
            objects: ObjectRegistry::new(),
            state: RwLock::new(State {
                parent: Weak::new(),
                entries: Vec::new(),
                show_exception: None,
                show_stacktrace: None,
                inherit_error_documents: true,
                error_documents: BTreeMap::new(),
                headers: BTreeMap::new(),
                effective_headers: BTreeMap::new(),
                initialized: false,
            }),
        })
    }

    pub fn kind(&self) -> &ContextKind {
        &self.kind
    }

    pub fn objects(&self) -> &Arc<ObjectRegistry> {
        &self.objects
    }

    pub fn parent(&self) -> Option<Arc<HttpContext>> {
        self.state.read().parent.upgrade()
    }

    /// Append an owned procedure entry. The object must satisfy the
    /// `Procedure` capability.
    pub fn add_procedure(&self, procedure: Arc<dyn Object>) -> Result<(), EngineError> {
        if procedure.as_procedure().is_none() {
            return Err(EngineError::NotAProcedure("<owned>".to_string()));
        }
        self.state.write().entries.push(HttpEntry::Procedure(procedure));
        Ok(())
    }

    /// Append a procedure entry resolved through the object registry.
    pub fn add_procedure_ref(&self, ref_id: &str) -> Result<(), EngineError> {
        let object = self
            .objects
            .find_object(ref_id)
            .ok_or_else(|| EngineError::ObjectNotFound(ref_id.to_string()))?;
        if object.as_procedure().is_none() {
            return Err(EngineError::NotAProcedure(ref_id.to_string()));
        }
        self.state.write().entries.push(HttpEntry::ProcedureRef(object));
        Ok(())
    }

    /// Append an owned child node (plain, endpoint or host) and wire its
    /// parent pointers. With `inherit_objects` the child also resolves
    /// object lookups through this node.
    pub fn add_child(self: &Arc<Self>, child: Arc<HttpContext>, inherit_objects: bool) {
        if inherit_objects {
            child.attach_parent(self);
        }
        self.state.write().entries.push(HttpEntry::Context(child));
    }

    /// Register a named child as an object only; it dispatches when a
    /// reference entry names it.
    pub fn register_child(
        self: &Arc<Self>,
        id: &str,
        child: Arc<HttpContext>,
        inherit_objects: bool,
    ) -> Result<(), EngineError> {
        if inherit_objects {
            child.attach_parent(self);
        }
        self.objects.add_object(id, child as Arc<dyn Object>)?;
        Ok(())
    }

    /// Append a reference entry to a context registered elsewhere.
    pub fn add_context_ref(&self, ref_id: &str) -> Result<(), EngineError> {
        let object = self
            .objects
            .find_object(ref_id)
            .ok_or_else(|| EngineError::ObjectNotFound(ref_id.to_string()))?;
        let context = downcast_object::<HttpContext>(object)
            .ok_or_else(|| EngineError::NotAContext(ref_id.to_string()))?;
        self.state.write().entries.push(HttpEntry::ContextRef(context));
        Ok(())
    }

    pub fn add_request_handler(&self, handler: Arc<dyn HttpRequestHandler>) {
        self.state.write().entries.push(HttpEntry::RequestHandler(handler));
    }

    /// Append a dispatch entry over an applications collection registered
    /// under `ref_id`.
    pub fn add_applications_ref(&self, ref_id: &str) -> Result<(), EngineError> {
        let applications = self
            .objects
            .find_object_as::<Applications>(ref_id)
            .ok_or_else(|| EngineError::ObjectNotFound(ref_id.to_string()))?;
        self.state.write().entries.push(HttpEntry::Applications(applications));
        Ok(())
    }

    fn attach_parent(&self, parent: &Arc<HttpContext>) {
        self.state.write().parent = Arc::downgrade(parent);
        self.objects.set_parent(parent.objects());
    }

    pub fn set_show_exception(&self, value: Option<bool>) {
        self.state.write().show_exception = value;
    }

    /// Resolved bottom-up; the root default is `true`.
    pub fn show_exception(&self) -> bool {
        let state = self.state.read();
        match state.show_exception {
            Some(value) => value,
            None => match state.parent.upgrade() {
                Some(parent) => parent.show_exception(),
                None => true,
            },
        }
    }

    pub fn set_show_stacktrace(&self, value: Option<bool>) {
        self.state.write().show_stacktrace = value;
    }

    /// Resolved bottom-up; the root default is `false`.
    pub fn show_stacktrace(&self) -> bool {
        let state = self.state.read();
        match state.show_stacktrace {
            Some(value) => value,
            None => match state.parent.upgrade() {
                Some(parent) => parent.show_stacktrace(),
                None => false,
            },
        }
    }

    pub fn set_inherit_error_documents(&self, inherit: bool) {
        self.state.write().inherit_error_documents = inherit;
    }

    pub fn add_error_document(
        &self,
        status: u16,
        document: ErrorDocument,
    ) -> Result<(), EngineError> {
        let mut state = self.state.write();
        if state.error_documents.contains_key(&status) {
            return Err(EngineError::DuplicateErrorDocument(status));
        }
        state.error_documents.insert(status, document);
        Ok(())
    }

    /// Nearest error document for `status`: local map first, then the
    /// parent chain while `inherit_error_documents` holds.
    pub fn find_error_document(&self, status: u16) -> Option<ErrorDocument> {
        let state = self.state.read();
        if let Some(document) = state.error_documents.get(&status) {
            return Some(document.clone());
        }
        if state.inherit_error_documents {
            if let Some(parent) = state.parent.upgrade() {
                return parent.find_error_document(status);
            }
        }
        None
    }

    pub fn add_header(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state.write().headers.insert(key.into(), value.into());
    }

    /// Parent's effective headers overlaid with local additions; computed
    /// once at initialize and frozen.
    pub fn effective_headers(&self) -> BTreeMap<String, String> {
        self.state.read().effective_headers.clone()
    }

    /// Freeze the node: compute effective headers, initialize owned
    /// objects and descend into owned entries. Runs once.
    pub fn initialize(self: &Arc<Self>) -> Result<(), BoxError> {
        {
            let mut state = self.state.write();
            if state.initialized {
                return Ok(());
            }
            state.initialized = true;

            let mut effective = match state.parent.upgrade() {
                Some(parent) => parent.effective_headers(),
                None => BTreeMap::new(),
            };
            for (key, value) in &state.headers {
                effective.insert(key.clone(), value.clone());
            }
            state.effective_headers = effective;
        }

        self.objects.initialize()?;

        let entries = self.state.read().entries.clone();
        for entry in &entries {
            entry.initialize(self)?;
        }
        Ok(())
    }

    /// Dispatch one request: entries in insertion order, first non-empty
    /// input wins. The request context's nearest-context pointers are
    /// updated before every entry so the failure path sees this node.
    pub fn accept(self: &Arc<Self>, ctx: &mut RequestContext<'_>) -> Result<Input, HandlerError> {
        let entries = self.state.read().entries.clone();
        for entry in &entries {
            ctx.enter_context(self);
            let input = entry.accept(ctx)?;
            if !input.is_empty() {
                return Ok(input);
            }
        }
        Ok(Input::empty())
    }

    pub fn dump_tree(&self, depth: usize) {
        let indent = "|   ".repeat(depth);
        let state = self.state.read();
        match &self.kind {
            ContextKind::Plain => info!("{indent}+-> Context"),
            ContextKind::Endpoint { path } => info!("{indent}+-> Endpoint: \"{path}\""),
            ContextKind::Host { pattern } => info!("{indent}+-> Host: \"{pattern}\""),
        }
        if !state.headers.is_empty() {
            info!("{indent}|   response headers: {}", state.headers.len());
        }
        if !state.error_documents.is_empty() {
            info!("{indent}|   error documents: {}", state.error_documents.len());
        }
        drop(state);
        self.objects.dump_tree(depth + 1);
        let entries = self.state.read().entries.clone();
        for entry in &entries {
            entry.dump_tree(depth + 1);
        }
    }
}

impl Object for HttpContext {
    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }
}

impl Initializable for HttpContext {
    fn initialize(&self, _owner: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        match self.weak.upgrade() {
            Some(this) => this.initialize(),
            None => Ok(()),
        }
    }
}

/// Normalize an endpoint path: leading `/`, no trailing `/`.
pub(crate) fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Endpoint matching: `p` equals the endpoint path or continues it at a
/// segment boundary. Returns the sub-path for descendants.
pub(crate) fn match_endpoint(path: &str, p: &str) -> Option<String> {
    if p == path {
        return Some(String::new());
    }
    let rest = p.strip_prefix(path)?;
    if rest.starts_with('/') {
        return Some(rest.to_string());
    }
    None
}

/// Virtual-host matching: `*` wildcards match any label sequence.
pub(crate) fn match_host(pattern: &str, hostname: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let pattern = pattern.to_ascii_lowercase();
    let hostname = hostname.to_ascii_lowercase();
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return hostname.ends_with(&format!(".{suffix}"));
    }
    pattern == hostname
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
