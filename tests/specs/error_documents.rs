// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error-document resolution on the wire.

use crate::prelude::*;

use gantry_engine::http::ErrorDocument;
use gantry_engine::ProcessRegistry;

#[test]
fn http_scheme_documents_redirect_with_301() {
    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());

    server
        .context()
        .add_error_document(404, ErrorDocument::new("http://errors.example/notfound"))
        .unwrap();
    server.context().add_request_handler(Arc::new(Throw(404)));
    server.initialize(&Default::default()).unwrap();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    let driven = listener.drive(HttpRequest::get("/missing")).unwrap();
    assert_eq!(driven.status(), Some(301));
    assert_eq!(driven.header("Location"), Some("http://errors.example/notfound"));
}

#[test]
fn documents_inherit_to_nested_contexts() {
    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());

    server
        .context()
        .add_error_document(404, ErrorDocument::new("http://errors.example/notfound"))
        .unwrap();

    let api = HttpContext::endpoint("/api");
    api.add_request_handler(Arc::new(Throw(404)));
    server.context().add_child(api, true);
    server.initialize(&Default::default()).unwrap();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    let driven = listener.drive(HttpRequest::get("/api/missing")).unwrap();
    assert_eq!(driven.status(), Some(301));
}

#[test]
fn inheritance_can_be_cut_off() {
    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());

    server
        .context()
        .add_error_document(404, ErrorDocument::new("http://errors.example/notfound"))
        .unwrap();

    let api = HttpContext::endpoint("/api");
    api.set_inherit_error_documents(false);
    api.add_request_handler(Arc::new(Throw(404)));
    server.context().add_child(api, true);
    server.initialize(&Default::default()).unwrap();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    // No document applies inside /api: the body is synthesized instead.
    let driven = listener.drive(HttpRequest::get("/api/missing")).unwrap();
    assert_eq!(driven.status(), Some(404));
    assert_eq!(driven.header("Location"), None);
    assert!(driven.body_text().contains("404"));
}

#[test]
fn file_documents_stream_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("notfound.html");
    std::fs::write(&page, b"<h1>gone</h1>").unwrap();

    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());
    server
        .context()
        .add_error_document(404, ErrorDocument::new(page.display().to_string()))
        .unwrap();
    server.context().add_request_handler(Arc::new(Throw(404)));
    server.initialize(&Default::default()).unwrap();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    let driven = listener.drive(HttpRequest::get("/missing")).unwrap();
    assert_eq!(driven.status(), Some(404));
    assert_eq!(driven.response.as_ref().unwrap().content_type, "text/html");
    match driven.body {
        Some(Body::File(path)) => assert_eq!(path, page),
        other => panic!("unexpected body: {other:?}"),
    }
}
