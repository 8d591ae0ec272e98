// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use yare::parameterized;

use gantry_transport::local::CapturedConnection;
use gantry_transport::{Body, HttpRequest};

use crate::failure::{Failure, HandlerError, StatusError};
use crate::http::context::{ErrorDocument, HttpContext};
use crate::http::request::RequestContext;

use super::*;

fn send_with_context(
    failure: &Failure,
    context: Option<&Arc<HttpContext>>,
) -> CapturedConnection {
    let mut connection = CapturedConnection::default();
    {
        let mut ctx = RequestContext::new(HttpRequest::get("/x"), &mut connection);
        if let Some(context) = context {
            ctx.enter_context(context);
        }
        send_failure(failure, &mut ctx);
    }
    connection
}

#[test]
fn http_documents_redirect_with_301() {
    let context = HttpContext::new();
    context
        .add_error_document(404, ErrorDocument::new("http://errors.example/notfound"))
        .unwrap();
    context.initialize().unwrap();

    let failure = Failure::new(HandlerError::from(StatusError::new(404)));
    let connection = send_with_context(&failure, Some(&context));

    let (response, body) = connection.sent.unwrap();
    assert_eq!(response.status, 301);
    assert_eq!(
        response.headers.get("Location").map(String::as_str),
        Some("http://errors.example/notfound")
    );
    match body {
        Body::Bytes(bytes) => assert!(String::from_utf8_lossy(&bytes).contains("301")),
        other => panic!("unexpected body: {other:?}"),
    }
}

#[test]
fn file_documents_stream_with_mime_by_filename() {
    let context = HttpContext::new();
    context
        .add_error_document(404, ErrorDocument::new("file:///srv/errors/notfound.html"))
        .unwrap();
    context.initialize().unwrap();

    let failure = Failure::new(HandlerError::from(StatusError::new(404)));
    let connection = send_with_context(&failure, Some(&context));

    let (response, body) = connection.sent.unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.content_type, "text/html");
    assert_eq!(body, Body::File("/srv/errors/notfound.html".into()));
}

#[test]
fn interpolated_documents_are_streamed_verbatim() {
    let context = HttpContext::new();
    context
        .add_error_document(500, ErrorDocument::interpolated("/srv/errors/oops.html"))
        .unwrap();
    context.initialize().unwrap();

    let failure = Failure::new(HandlerError::Runtime("boom".into()));
    let connection = send_with_context(&failure, Some(&context));

    let (response, body) = connection.sent.unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(body, Body::File("/srv/errors/oops.html".into()));
}

#[test]
fn synthesized_html_body_applies_without_a_document() {
    let failure = Failure::new(HandlerError::from(StatusError::new(404)));
    let connection = send_with_context(&failure, None);

    let (response, body) = connection.sent.unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.content_type, "text/html");
    match body {
        Body::Bytes(bytes) => {
            let page = String::from_utf8_lossy(&bytes);
            assert!(page.contains("404"));
            assert!(page.contains("<html>"));
        }
        other => panic!("unexpected body: {other:?}"),
    }
}

#[test]
fn plain_text_status_errors_synthesize_text_bodies() {
    let failure = Failure::new(HandlerError::from(
        StatusError::new(503).with_content_type("text/plain"),
    ));
    let connection = send_with_context(&failure, None);

    let (response, body) = connection.sent.unwrap();
    assert_eq!(response.content_type, "text/plain");
    match body {
        Body::Bytes(bytes) => {
            assert!(String::from_utf8_lossy(&bytes).contains("Status code: 503"));
        }
        other => panic!("unexpected body: {other:?}"),
    }
}

#[test]
fn show_exception_false_hides_the_message() {
    let context = HttpContext::new();
    context.set_show_exception(Some(false));
    context.initialize().unwrap();

    let failure = Failure::new(HandlerError::Runtime("secret detail".into()));
    let connection = send_with_context(&failure, Some(&context));

    let (_, body) = connection.sent.unwrap();
    match body {
        Body::Bytes(bytes) => assert!(!String::from_utf8_lossy(&bytes).contains("secret detail")),
        other => panic!("unexpected body: {other:?}"),
    }
}

#[test]
fn effective_headers_decorate_failure_responses() {
    let context = HttpContext::new();
    context.add_header("x-server", "gantry");
    context.initialize().unwrap();

    let failure = Failure::new(HandlerError::from(StatusError::new(404)));
    let connection = send_with_context(&failure, Some(&context));

    let (response, _) = connection.sent.unwrap();
    assert_eq!(response.headers.get("x-server").map(String::as_str), Some("gantry"));
}

#[parameterized(
    html = { "page.html", "text/html" },
    text = { "readme.txt", "text/plain" },
    json = { "data.json", "application/json" },
    unknown = { "blob.bin", "application/octet-stream" },
    no_extension = { "Makefile", "application/octet-stream" },
)]
fn mime_types_by_filename(path: &str, expected: &str) {
    assert_eq!(mime_by_filename(path), expected);
}
