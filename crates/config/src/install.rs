// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build a configured supervisor from a parsed configuration tree.
//!
//! Installation is strict: unresolved references, ambiguous endpoints and
//! reference cycles fail here, with the declaration position, before any
//! procedure starts. Endpoint ambiguity is checked per server over the
//! normalized full path (nested prefixes concatenated), so `/a` > `/b`
//! collides with a sibling `/a/b`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, trace};

use gantry_core::{Object, ObjectRegistry};
use gantry_engine::basic::BasicContext;
use gantry_engine::http::{ContextKind, ErrorDocument, HttpContext};
use gantry_engine::{
    BasicServer, EngineError, HttpServer, Main, MainOptions, Plugins, ProcedureContext,
};

use crate::error::ConfigError;
use crate::model::{
    to_pairs, ContextDecl, DocLanguage, EntryDecl, ExceptionsDecl, HeaderDecl, MainConfig,
    ObjectDecl, ProcedureDecl, ReferenceDecl, ServerDecl, ServerKind, TopLevelDecl,
};

/// Install `config` into a new [`Main`] supervisor.
pub fn install(
    config: &MainConfig,
    plugins: &dyn Plugins,
    options: MainOptions,
) -> Result<Arc<Main>, ConfigError> {
    let main = Main::new(options);

    for library in &config.libraries {
        // Library loading happens in the embedder before the plugin set is
        // built; the declaration is only traced here.
        trace!(path = %library.path, "library declaration");
    }

    for certificate in &config.certificates {
        debug!(hostname = %certificate.hostname, "loading certificate");
        main.add_certificate_files(
            &certificate.hostname,
            &certificate.key_file,
            &certificate.cert_file,
        )
        .map_err(|err| ConfigError::from_engine(err, &certificate.position))?;
    }

    for declaration in &config.entries {
        match declaration {
            TopLevelDecl::Object(decl) => {
                install_object(main.objects(), decl, plugins)?;
            }
            TopLevelDecl::Reference(decl) => {
                install_reference(main.objects(), decl)?;
            }
            TopLevelDecl::Procedure(decl) => {
                install_main_procedure(&main, decl, plugins)?;
            }
            TopLevelDecl::Context(decl) => {
                install_procedure_context(&main, decl, plugins)?;
            }
            TopLevelDecl::Server(decl) => {
                install_server(&main, decl, plugins)?;
            }
        }
    }

    Ok(main)
}

pub(crate) fn install_object(
    objects: &Arc<ObjectRegistry>,
    decl: &ObjectDecl,
    plugins: &dyn Plugins,
) -> Result<(), ConfigError> {
    let object = plugins
        .create_object(&decl.implementation, &to_pairs(&decl.parameters))
        .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
    objects
        .add_object(&decl.id, object)
        .map_err(|err| ConfigError::from_registry(err, &decl.position))
}

pub(crate) fn install_reference(
    objects: &Arc<ObjectRegistry>,
    decl: &ReferenceDecl,
) -> Result<(), ConfigError> {
    objects
        .add_reference_to(&decl.id, &decl.ref_id)
        .map_err(|err| ConfigError::from_registry(err, &decl.position))
}

/// A procedure declaration either references an existing procedure or
/// creates one. Created procedures with an `id` are registered as objects
/// only; unnamed ones become entries directly.
fn install_main_procedure(
    main: &Arc<Main>,
    decl: &ProcedureDecl,
    plugins: &dyn Plugins,
) -> Result<(), ConfigError> {
    if let Some(ref_id) = &decl.ref_id {
        if decl.implementation.is_some() {
            return Err(ConfigError::InvalidValue {
                name: "ref-id".to_string(),
                value: ref_id.clone(),
                position: decl.position.clone(),
            });
        }
        return main
            .add_procedure_ref(ref_id)
            .map_err(|err| ConfigError::from_engine(err, &decl.position));
    }

    let implementation = decl.implementation.as_ref().ok_or_else(|| {
        ConfigError::MissingAttribute {
            name: "implementation".to_string(),
            position: decl.position.clone(),
        }
    })?;
    let object = plugins
        .create_object(implementation, &to_pairs(&decl.parameters))
        .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
    if object.as_procedure().is_none() {
        return Err(ConfigError::from_engine(
            EngineError::NotAProcedure(implementation.clone()),
            &decl.position,
        ));
    }

    match &decl.id {
        Some(id) => main
            .objects()
            .add_object(id, object)
            .map_err(|err| ConfigError::from_registry(err, &decl.position)),
        None => main
            .add_procedure(object)
            .map_err(|err| ConfigError::from_engine(err, &decl.position)),
    }
}

/// A top-level context groups procedures into a batch that is itself a
/// procedure.
fn install_procedure_context(
    main: &Arc<Main>,
    decl: &ContextDecl,
    plugins: &dyn Plugins,
) -> Result<(), ConfigError> {
    if let Some(ref_id) = &decl.ref_id {
        if decl.id.is_some() || !decl.entries.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "ref-id".to_string(),
                value: ref_id.clone(),
                position: decl.position.clone(),
            });
        }
        return main
            .add_procedure_context_ref(ref_id)
            .map_err(|err| ConfigError::from_engine(err, &decl.position));
    }

    if !decl.response_headers.is_empty() {
        return Err(ConfigError::UnknownAttribute {
            name: "response-headers".to_string(),
            position: decl.position.clone(),
        });
    }
    if decl.exceptions.is_some() {
        return Err(ConfigError::UnknownAttribute {
            name: "exceptions".to_string(),
            position: decl.position.clone(),
        });
    }

    let context = ProcedureContext::new(Arc::clone(main.registry()));
    if decl.inherit {
        context.objects().set_parent(main.objects());
    }

    for entry in &decl.entries {
        match entry {
            EntryDecl::Procedure(procedure) => {
                install_context_procedure(&context, procedure, plugins)?;
            }
            EntryDecl::Object(object) => install_object(context.objects(), object, plugins)?,
            EntryDecl::Reference(reference) => install_reference(context.objects(), reference)?,
            EntryDecl::Context(nested) => {
                return Err(ConfigError::InvalidValue {
                    name: "context".to_string(),
                    value: nested.id.clone().unwrap_or_default(),
                    position: nested.position.clone(),
                });
            }
            EntryDecl::Endpoint(endpoint) => {
                return Err(ConfigError::InvalidValue {
                    name: "endpoint".to_string(),
                    value: endpoint.path.clone(),
                    position: endpoint.position.clone(),
                });
            }
            EntryDecl::Host(host) => {
                return Err(ConfigError::InvalidValue {
                    name: "host".to_string(),
                    value: host.server_name.clone(),
                    position: host.position.clone(),
                });
            }
            EntryDecl::RequestHandler(handler) => {
                return Err(ConfigError::InvalidValue {
                    name: "request-handler".to_string(),
                    value: handler.implementation.clone(),
                    position: handler.position.clone(),
                });
            }
        }
    }

    match &decl.id {
        Some(id) => main
            .objects()
            .add_object(id, context as Arc<dyn Object>)
            .map_err(|err| ConfigError::from_registry(err, &decl.position)),
        None => {
            main.add_procedure_context(context);
            Ok(())
        }
    }
}

fn install_context_procedure(
    context: &Arc<ProcedureContext>,
    decl: &ProcedureDecl,
    plugins: &dyn Plugins,
) -> Result<(), ConfigError> {
    if let Some(ref_id) = &decl.ref_id {
        return context
            .add_procedure_ref(ref_id)
            .map_err(|err| ConfigError::from_engine(err, &decl.position));
    }
    let implementation = decl.implementation.as_ref().ok_or_else(|| {
        ConfigError::MissingAttribute {
            name: "implementation".to_string(),
            position: decl.position.clone(),
        }
    })?;
    let object = plugins
        .create_object(implementation, &to_pairs(&decl.parameters))
        .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
    match &decl.id {
        Some(id) => context
            .objects()
            .add_object(id, object)
            .map_err(|err| ConfigError::from_registry(err, &decl.position)),
        None => context
            .add_procedure(object)
            .map_err(|err| ConfigError::from_engine(err, &decl.position)),
    }
}

/// Install a procedure declaration into a bare registry: a created
/// procedure must carry an `id` (there is no entry list to append to).
pub(crate) fn install_named_procedure(
    objects: &Arc<ObjectRegistry>,
    decl: &ProcedureDecl,
    plugins: &dyn Plugins,
) -> Result<(), ConfigError> {
    if let Some(ref_id) = &decl.ref_id {
        let id = decl.id.as_ref().unwrap_or(ref_id);
        return objects
            .add_reference_to(id, ref_id)
            .map_err(|err| ConfigError::from_registry(err, &decl.position));
    }
    let implementation = decl.implementation.as_ref().ok_or_else(|| {
        ConfigError::MissingAttribute {
            name: "implementation".to_string(),
            position: decl.position.clone(),
        }
    })?;
    let id = decl.id.as_ref().ok_or_else(|| ConfigError::MissingAttribute {
        name: "id".to_string(),
        position: decl.position.clone(),
    })?;
    let object = plugins
        .create_object(implementation, &to_pairs(&decl.parameters))
        .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
    if object.as_procedure().is_none() {
        return Err(ConfigError::from_engine(
            EngineError::NotAProcedure(implementation.clone()),
            &decl.position,
        ));
    }
    objects
        .add_object(id, object)
        .map_err(|err| ConfigError::from_registry(err, &decl.position))
}

fn install_server(
    main: &Arc<Main>,
    decl: &ServerDecl,
    plugins: &dyn Plugins,
) -> Result<(), ConfigError> {
    let pairs = to_pairs(&decl.parameters);
    match decl.kind {
        ServerKind::Http | ServerKind::Https => {
            let listener = plugins
                .create_http_listener(&decl.implementation, &pairs)
                .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
            let server = HttpServer::new(
                listener,
                decl.kind == ServerKind::Https,
                Arc::clone(main.registry()),
            );
            let root = Arc::clone(server.context());
            if decl.inherit {
                root.objects().set_parent(main.objects());
            }
            apply_headers(&root, &decl.response_headers);
            apply_exceptions(&root, decl.exceptions.as_ref())?;

            let mut endpoints = BTreeSet::new();
            let mut stack = vec![context_key(&root)];
            build_http_entries(&root, &decl.entries, plugins, &mut endpoints, "", &mut stack)?;

            main.add_http_server(server);
        }
        ServerKind::Basic => {
            if !decl.response_headers.is_empty() {
                return Err(ConfigError::UnknownAttribute {
                    name: "response-headers".to_string(),
                    position: decl.position.clone(),
                });
            }
            if decl.exceptions.is_some() {
                return Err(ConfigError::UnknownAttribute {
                    name: "exceptions".to_string(),
                    position: decl.position.clone(),
                });
            }
            let listener = plugins
                .create_basic_listener(&decl.implementation, &pairs)
                .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
            let server = BasicServer::new(listener, Arc::clone(main.registry()));
            let root = Arc::clone(server.context());
            if decl.inherit {
                root.objects().set_parent(main.objects());
            }

            let mut stack = vec![basic_context_key(&root)];
            build_basic_entries(&root, &decl.entries, plugins, &mut stack)?;

            main.add_basic_server(server);
        }
    }
    Ok(())
}

fn apply_headers(context: &Arc<HttpContext>, headers: &[HeaderDecl]) {
    for header in headers {
        context.add_header(&header.key, &header.value);
    }
}

pub(crate) fn apply_exceptions(
    context: &Arc<HttpContext>,
    exceptions: Option<&ExceptionsDecl>,
) -> Result<(), ConfigError> {
    let Some(exceptions) = exceptions else {
        return Ok(());
    };
    context.set_inherit_error_documents(exceptions.inherit_documents);
    context.set_show_exception(exceptions.show_exceptions);
    context.set_show_stacktrace(exceptions.show_stacktrace);
    for document in &exceptions.documents {
        let error_document = match document.language {
            DocLanguage::None => ErrorDocument::new(&document.path),
            DocLanguage::BuiltinScript => ErrorDocument::interpolated(&document.path),
        };
        context
            .add_error_document(document.status_code, error_document)
            .map_err(|err| ConfigError::from_engine(err, &document.position))?;
    }
    Ok(())
}

fn context_key(context: &Arc<HttpContext>) -> usize {
    Arc::as_ptr(context) as usize
}

fn basic_context_key(context: &Arc<BasicContext>) -> usize {
    Arc::as_ptr(context) as usize
}

/// Build an HTTP context's entry list. `prefix` is the normalized
/// endpoint path accumulated from the server root; `stack` holds the
/// identities of the contexts currently being built, for cycle detection.
pub(crate) fn build_http_entries(
    context: &Arc<HttpContext>,
    entries: &[EntryDecl],
    plugins: &dyn Plugins,
    endpoints: &mut BTreeSet<String>,
    prefix: &str,
    stack: &mut Vec<usize>,
) -> Result<(), ConfigError> {
    for entry in entries {
        match entry {
            EntryDecl::Context(decl) => {
                if let Some(ref_id) = &decl.ref_id {
                    if decl.id.is_some() || !decl.entries.is_empty() {
                        return Err(ConfigError::InvalidValue {
                            name: "ref-id".to_string(),
                            value: ref_id.clone(),
                            position: decl.position.clone(),
                        });
                    }
                    check_http_cycle(context, ref_id, stack, decl)?;
                    context
                        .add_context_ref(ref_id)
                        .map_err(|err| ConfigError::from_engine(err, &decl.position))?;
                    continue;
                }

                let child = HttpContext::new();
                apply_headers(&child, &decl.response_headers);
                apply_exceptions(&child, decl.exceptions.as_ref())?;
                match &decl.id {
                    Some(id) => context
                        .register_child(id, Arc::clone(&child), decl.inherit)
                        .map_err(|err| ConfigError::from_engine(err, &decl.position))?,
                    None => context.add_child(Arc::clone(&child), decl.inherit),
                }
                stack.push(context_key(&child));
                build_http_entries(&child, &decl.entries, plugins, endpoints, prefix, stack)?;
                stack.pop();
            }
            EntryDecl::Endpoint(decl) => {
                let child = HttpContext::endpoint(&decl.path);
                let normalized = match child.kind() {
                    ContextKind::Endpoint { path } => path.clone(),
                    _ => decl.path.clone(),
                };
                let full_path = format!("{prefix}{normalized}");
                if !endpoints.insert(full_path.clone()) {
                    return Err(ConfigError::AmbiguousEndpoint {
                        path: full_path,
                        position: decl.position.clone(),
                    });
                }
                apply_headers(&child, &decl.response_headers);
                apply_exceptions(&child, decl.exceptions.as_ref())?;
                context.add_child(Arc::clone(&child), decl.inherit);
                stack.push(context_key(&child));
                build_http_entries(&child, &decl.entries, plugins, endpoints, &full_path, stack)?;
                stack.pop();
            }
            EntryDecl::Host(decl) => {
                let child = HttpContext::host(&decl.server_name);
                apply_headers(&child, &decl.response_headers);
                apply_exceptions(&child, decl.exceptions.as_ref())?;
                context.add_child(Arc::clone(&child), decl.inherit);
                stack.push(context_key(&child));
                build_http_entries(&child, &decl.entries, plugins, endpoints, prefix, stack)?;
                stack.pop();
            }
            EntryDecl::RequestHandler(decl) => {
                let handler = plugins
                    .create_http_handler(&decl.implementation, &to_pairs(&decl.parameters))
                    .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
                context.add_request_handler(handler);
            }
            EntryDecl::Procedure(decl) => {
                install_http_procedure(context, decl, plugins)?;
            }
            EntryDecl::Object(decl) => install_object(context.objects(), decl, plugins)?,
            EntryDecl::Reference(decl) => install_reference(context.objects(), decl)?,
        }
    }
    Ok(())
}

fn check_http_cycle(
    context: &Arc<HttpContext>,
    ref_id: &str,
    stack: &[usize],
    decl: &ContextDecl,
) -> Result<(), ConfigError> {
    let resolved = context.objects().find_object(ref_id).ok_or_else(|| {
        ConfigError::ObjectNotFound { ref_id: ref_id.to_string(), position: decl.position.clone() }
    })?;
    let resolved = gantry_core::downcast_object::<HttpContext>(resolved).ok_or_else(|| {
        ConfigError::from_engine(EngineError::NotAContext(ref_id.to_string()), &decl.position)
    })?;
    if stack.contains(&context_key(&resolved)) {
        return Err(ConfigError::CyclicReference {
            id: ref_id.to_string(),
            position: decl.position.clone(),
        });
    }
    Ok(())
}

fn install_http_procedure(
    context: &Arc<HttpContext>,
    decl: &ProcedureDecl,
    plugins: &dyn Plugins,
) -> Result<(), ConfigError> {
    if let Some(ref_id) = &decl.ref_id {
        return context
            .add_procedure_ref(ref_id)
            .map_err(|err| ConfigError::from_engine(err, &decl.position));
    }
    let implementation = decl.implementation.as_ref().ok_or_else(|| {
        ConfigError::MissingAttribute {
            name: "implementation".to_string(),
            position: decl.position.clone(),
        }
    })?;
    let object = plugins
        .create_object(implementation, &to_pairs(&decl.parameters))
        .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
    match &decl.id {
        Some(id) => context
            .objects()
            .add_object(id, object)
            .map_err(|err| ConfigError::from_registry(err, &decl.position)),
        None => context
            .add_procedure(object)
            .map_err(|err| ConfigError::from_engine(err, &decl.position)),
    }
}

/// Build a basic context's entry list; hosts and endpoints do not exist in
/// the basic tree.
pub(crate) fn build_basic_entries(
    context: &Arc<BasicContext>,
    entries: &[EntryDecl],
    plugins: &dyn Plugins,
    stack: &mut Vec<usize>,
) -> Result<(), ConfigError> {
    for entry in entries {
        match entry {
            EntryDecl::Context(decl) => {
                if let Some(ref_id) = &decl.ref_id {
                    if decl.id.is_some() || !decl.entries.is_empty() {
                        return Err(ConfigError::InvalidValue {
                            name: "ref-id".to_string(),
                            value: ref_id.clone(),
                            position: decl.position.clone(),
                        });
                    }
                    check_basic_cycle(context, ref_id, stack, decl)?;
                    context
                        .add_context_ref(ref_id)
                        .map_err(|err| ConfigError::from_engine(err, &decl.position))?;
                    continue;
                }
                if !decl.response_headers.is_empty() {
                    return Err(ConfigError::UnknownAttribute {
                        name: "response-headers".to_string(),
                        position: decl.position.clone(),
                    });
                }
                if decl.exceptions.is_some() {
                    return Err(ConfigError::UnknownAttribute {
                        name: "exceptions".to_string(),
                        position: decl.position.clone(),
                    });
                }

                let child = BasicContext::new();
                match &decl.id {
                    Some(id) => context
                        .register_child(id, Arc::clone(&child), decl.inherit)
                        .map_err(|err| ConfigError::from_engine(err, &decl.position))?,
                    None => context.add_child(Arc::clone(&child), decl.inherit),
                }
                stack.push(basic_context_key(&child));
                build_basic_entries(&child, &decl.entries, plugins, stack)?;
                stack.pop();
            }
            EntryDecl::RequestHandler(decl) => {
                let handler = plugins
                    .create_basic_handler(&decl.implementation, &to_pairs(&decl.parameters))
                    .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
                context.add_request_handler(handler);
            }
            EntryDecl::Procedure(decl) => {
                install_basic_procedure(context, decl, plugins)?;
            }
            EntryDecl::Object(decl) => install_object(context.objects(), decl, plugins)?,
            EntryDecl::Reference(decl) => install_reference(context.objects(), decl)?,
            EntryDecl::Endpoint(decl) => {
                return Err(ConfigError::InvalidValue {
                    name: "endpoint".to_string(),
                    value: decl.path.clone(),
                    position: decl.position.clone(),
                });
            }
            EntryDecl::Host(decl) => {
                return Err(ConfigError::InvalidValue {
                    name: "host".to_string(),
                    value: decl.server_name.clone(),
                    position: decl.position.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_basic_cycle(
    context: &Arc<BasicContext>,
    ref_id: &str,
    stack: &[usize],
    decl: &ContextDecl,
) -> Result<(), ConfigError> {
    let resolved = context.objects().find_object(ref_id).ok_or_else(|| {
        ConfigError::ObjectNotFound { ref_id: ref_id.to_string(), position: decl.position.clone() }
    })?;
    let resolved = gantry_core::downcast_object::<BasicContext>(resolved).ok_or_else(|| {
        ConfigError::from_engine(EngineError::NotAContext(ref_id.to_string()), &decl.position)
    })?;
    if stack.contains(&basic_context_key(&resolved)) {
        return Err(ConfigError::CyclicReference {
            id: ref_id.to_string(),
            position: decl.position.clone(),
        });
    }
    Ok(())
}

fn install_basic_procedure(
    context: &Arc<BasicContext>,
    decl: &ProcedureDecl,
    plugins: &dyn Plugins,
) -> Result<(), ConfigError> {
    if let Some(ref_id) = &decl.ref_id {
        return context
            .add_procedure_ref(ref_id)
            .map_err(|err| ConfigError::from_engine(err, &decl.position));
    }
    let implementation = decl.implementation.as_ref().ok_or_else(|| {
        ConfigError::MissingAttribute {
            name: "implementation".to_string(),
            position: decl.position.clone(),
        }
    })?;
    let object = plugins
        .create_object(implementation, &to_pairs(&decl.parameters))
        .map_err(|err| ConfigError::from_plugin(err, &decl.position))?;
    match &decl.id {
        Some(id) => context
            .objects()
            .add_object(id, object)
            .map_err(|err| ConfigError::from_registry(err, &decl.position)),
        None => context
            .add_procedure(object)
            .map_err(|err| ConfigError::from_engine(err, &decl.position)),
    }
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
