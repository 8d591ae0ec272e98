// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire behaviour of the failure path.
//!
//! An uncaught handler error ends up here. The nearest error-handling
//! context may name an error document for the status code; otherwise a
//! body is synthesized from the classified report, gated by the context's
//! show flags. Response headers always carry the nearest context's
//! effective headers, so header inheritance applies to failure responses
//! exactly as it does to handler responses.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, error};

use gantry_transport::{Body, Response};

use crate::failure::Failure;
use crate::http::context::DocumentLanguage;
use crate::http::request::RequestContext;

const PAGE_301: &str = "<!DOCTYPE html>\n\
<html>\n\
<head>\n\
<title>301</title>\n\
</head>\n\
<body>\n\
<h1>301</h1>\n\
</body>\n\
</html>\n";

/// Render `failure` onto the request's connection. Never fails; transport
/// errors while sending are logged and swallowed.
pub fn send_failure(failure: &Failure, ctx: &mut RequestContext<'_>) {
    let report = failure.report();

    let document = ctx.error_context().and_then(|c| c.find_error_document(report.status));
    let (show_exception, show_stacktrace) = match ctx.error_context() {
        Some(context) => (context.show_exception(), context.show_stacktrace()),
        None => (true, false),
    };
    let extra_headers = match ctx.headers_context() {
        Some(context) => context.effective_headers(),
        None => BTreeMap::new(),
    };

    if let Some(document) = document {
        if document.path.starts_with("http://") || document.path.starts_with("https://") {
            debug!(location = %document.path, "redirecting to error document");
            let response = with_headers(Response::new(301, "text/html"), &extra_headers)
                .with_header("Location", document.path);
            send(ctx, &response, Body::Bytes(PAGE_301.as_bytes().to_vec()));
            return;
        }

        let path = document.path.strip_prefix("file://").unwrap_or(&document.path).to_string();
        match document.language {
            // The built-in interpolator is outside the engine; its
            // documents are streamed verbatim like plain ones.
            DocumentLanguage::Plain | DocumentLanguage::BuiltinScript => {
                debug!(path = %path, "serving error document from file");
                let response =
                    with_headers(Response::new(report.status, mime_by_filename(&path)), &extra_headers);
                send(ctx, &response, Body::File(path.into()));
                return;
            }
        }
    }

    let body = match report.content_type.as_str() {
        "text/html" => report.html(show_exception, show_stacktrace),
        "text/plain" => report.text(show_exception, show_stacktrace),
        _ => report.message.clone(),
    };
    let response =
        with_headers(Response::new(report.status, report.content_type.clone()), &extra_headers);
    send(ctx, &response, Body::Bytes(body.into_bytes()));
}

fn with_headers(mut response: Response, headers: &BTreeMap<String, String>) -> Response {
    for (key, value) in headers {
        response.headers.insert(key.clone(), value.clone());
    }
    response
}

fn send(ctx: &mut RequestContext<'_>, response: &Response, body: Body) {
    if let Err(err) = ctx.connection().send(response, body) {
        error!("sending failure response failed: {err}");
    }
}

/// MIME type by file extension, for streamed error documents.
pub(crate) fn mime_by_filename(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
