// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP dispatch tree: contexts, endpoints, hosts and the server wrapper.

pub mod context;
pub mod entry;
pub mod failure;
pub mod request;
pub mod server;

pub use context::{ContextKind, DocumentLanguage, ErrorDocument, HttpContext};
pub use entry::HttpEntry;
pub use request::RequestContext;
pub use server::HttpServer;

use std::sync::Arc;

use gantry_core::{BoxError, ObjectRegistry};
use gantry_transport::Input;

use crate::failure::HandlerError;

/// A leaf of the HTTP dispatch tree.
///
/// `accept` returns an empty [`Input`] to pass the request on to the next
/// entry; errors short-circuit dispatch and are rendered by the server
/// wrapper. Handlers wishing to reject with a specific status return a
/// [`StatusError`](crate::failure::StatusError).
pub trait HttpRequestHandler: Send + Sync {
    fn accept(&self, ctx: &mut RequestContext<'_>) -> Result<Input, HandlerError>;

    /// One-time setup with the owning context's object registry.
    fn initialize(&self, objects: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        let _ = objects;
        Ok(())
    }
}
