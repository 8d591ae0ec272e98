// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single element of a context's ordered dispatch list.

use std::sync::Arc;

use tracing::trace;

use gantry_core::{BoxError, Object};
use gantry_transport::Input;

use crate::applications::Applications;
use crate::failure::HandlerError;
use crate::http::context::{match_endpoint, match_host, ContextKind, HttpContext};
use crate::http::request::RequestContext;
use crate::http::HttpRequestHandler;

/// Owned entries are initialized with their context; referenced entries
/// are initialized wherever they are owned.
#[derive(Clone)]
pub enum HttpEntry {
    Procedure(Arc<dyn Object>),
    ProcedureRef(Arc<dyn Object>),
    Context(Arc<HttpContext>),
    ContextRef(Arc<HttpContext>),
    RequestHandler(Arc<dyn HttpRequestHandler>),
    Applications(Arc<Applications>),
}

impl HttpEntry {
    pub(crate) fn initialize(&self, owner: &Arc<HttpContext>) -> Result<(), BoxError> {
        match self {
            HttpEntry::Procedure(object) => {
                if let Some(initializable) = object.as_initializable() {
                    initializable.initialize(owner.objects())?;
                }
                Ok(())
            }
            HttpEntry::Context(context) => context.initialize(),
            HttpEntry::RequestHandler(handler) => handler.initialize(owner.objects()),
            HttpEntry::ProcedureRef(_) | HttpEntry::ContextRef(_) | HttpEntry::Applications(_) => {
                Ok(())
            }
        }
    }

    pub(crate) fn accept(&self, ctx: &mut RequestContext<'_>) -> Result<Input, HandlerError> {
        match self {
            HttpEntry::Procedure(object) | HttpEntry::ProcedureRef(object) => {
                // Procedures do not consume the request; they may populate
                // per-request objects before later entries run.
                if let Some(procedure) = object.as_procedure() {
                    procedure.run(ctx.objects()).map_err(HandlerError::Other)?;
                }
                Ok(Input::empty())
            }
            HttpEntry::Context(context) | HttpEntry::ContextRef(context) => {
                Self::accept_context(context, ctx)
            }
            HttpEntry::RequestHandler(handler) => handler.accept(ctx),
            HttpEntry::Applications(applications) => applications.dispatch_http(ctx, None),
        }
    }

    fn accept_context(
        context: &Arc<HttpContext>,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Input, HandlerError> {
        match context.kind() {
            ContextKind::Plain => context.accept(ctx),
            ContextKind::Host { pattern } => {
                if match_host(pattern, &ctx.request().host_name) {
                    context.accept(ctx)
                } else {
                    Ok(Input::empty())
                }
            }
            ContextKind::Endpoint { path } => {
                let Some(sub_path) = match_endpoint(path, ctx.path()) else {
                    return Ok(Input::empty());
                };
                trace!(endpoint = %path, sub = %sub_path, "endpoint matched");
                let saved = ctx.path().to_string();
                ctx.set_path(sub_path);
                let input = context.accept(ctx)?;
                if input.is_empty() {
                    ctx.set_path(saved);
                }
                Ok(input)
            }
        }
    }

    pub(crate) fn dump_tree(&self, depth: usize) {
        let indent = "|   ".repeat(depth);
        match self {
            HttpEntry::Procedure(_) => tracing::info!("{indent}+-> Procedure"),
            HttpEntry::ProcedureRef(_) => tracing::info!("{indent}+-> Procedure (reference)"),
            HttpEntry::Context(context) => context.dump_tree(depth),
            HttpEntry::ContextRef(_) => tracing::info!("{indent}+-> Context (reference)"),
            HttpEntry::RequestHandler(_) => tracing::info!("{indent}+-> RequestHandler"),
            HttpEntry::Applications(_) => tracing::info!("{indent}+-> Applications (reference)"),
        }
    }
}
