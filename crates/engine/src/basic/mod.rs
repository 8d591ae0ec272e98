// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Basic-protocol dispatch tree and server wrapper.
//!
//! The basic tree mirrors the HTTP tree without hosts and endpoints;
//! instead every leaf handler advertises a notifier set and filters
//! messages by the request's `topic` value.

pub mod context;
pub mod server;

pub use context::{BasicContext, BasicEntry};
pub use server::BasicServer;

use std::collections::BTreeSet;
use std::sync::Arc;

use gantry_core::{BoxError, ObjectRegistry};
use gantry_transport::{BasicRequest, Input};

use crate::failure::HandlerError;

/// Per-message state threaded through the basic tree.
pub struct BasicRequestContext {
    request: BasicRequest,
    objects: Arc<ObjectRegistry>,
}

impl BasicRequestContext {
    pub fn new(request: BasicRequest) -> Self {
        Self { request, objects: ObjectRegistry::new() }
    }

    pub fn request(&self) -> &BasicRequest {
        &self.request
    }

    /// Registry for objects that live for this message only.
    pub fn objects(&self) -> &Arc<ObjectRegistry> {
        &self.objects
    }
}

/// A leaf of the basic dispatch tree.
///
/// Handlers must check the request topic against their notifier set first
/// and return an empty input when it does not apply; the context does not
/// pre-filter.
pub trait BasicRequestHandler: Send + Sync {
    fn accept(&self, ctx: &mut BasicRequestContext) -> Result<Input, HandlerError>;

    /// Topics this handler subscribes to.
    fn notifiers(&self) -> BTreeSet<String>;

    /// One-time setup with the owning context's object registry.
    fn initialize(&self, objects: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        let _ = objects;
        Ok(())
    }
}
