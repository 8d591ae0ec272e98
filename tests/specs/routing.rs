// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path routing through nested endpoints.

use crate::prelude::*;

use gantry_engine::ProcessRegistry;

fn echo_server() -> (Arc<HttpServer>, Arc<LocalHttpListener>) {
    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());

    let api = HttpContext::endpoint("/api");
    let v1 = HttpContext::endpoint("/v1");
    v1.add_request_handler(Arc::new(EchoPath));
    api.add_child(v1, true);
    server.context().add_child(api, true);

    server.initialize(&Default::default()).unwrap();
    (server, listener)
}

#[test]
fn nested_endpoints_rewrite_the_path_for_descendants() {
    let (server, listener) = echo_server();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    let driven = listener.drive(HttpRequest::get("/api/v1/ping")).unwrap();
    assert!(driven.accepted);
    assert_eq!(driven.status(), Some(200));
    assert_eq!(driven.body_text(), "/ping");
}

#[test]
fn paths_outside_the_endpoint_prefix_fall_through_to_404() {
    let (server, listener) = echo_server();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    let driven = listener.drive(HttpRequest::get("/api/v2/ping")).unwrap();
    assert!(!driven.accepted);
    assert_eq!(driven.status(), Some(404));
}

#[test]
fn declined_endpoints_leave_the_path_intact_for_siblings() {
    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());

    // /api matches but nothing inside accepts; the sibling handler must
    // observe the original path.
    let api = HttpContext::endpoint("/api");
    server.context().add_child(api, true);
    server.context().add_request_handler(Arc::new(EchoPath));
    server.initialize(&Default::default()).unwrap();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    let driven = listener.drive(HttpRequest::get("/api/v1/ping")).unwrap();
    assert_eq!(driven.body_text(), "/api/v1/ping");
}

#[test]
fn procedure_entries_populate_per_request_objects_for_later_entries() {
    use gantry_core::{Object, Value};

    /// Stamps a per-request object before any handler runs.
    struct Stamp;
    impl Object for Stamp {
        fn as_procedure(&self) -> Option<&dyn Procedure> {
            Some(self)
        }
    }
    impl Procedure for Stamp {
        fn run(&self, ctx: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
            ctx.add_object("request-tag", Arc::new(Value::new(41i32)))?;
            Ok(())
        }
        fn cancel(&self) {}
    }

    /// Answers with the stamped value.
    struct ReadTag;
    impl HttpRequestHandler for ReadTag {
        fn accept(&self, ctx: &mut RequestContext<'_>) -> Result<Input, HandlerError> {
            let tag = ctx
                .objects()
                .find_object_as::<Value<i32>>("request-tag")
                .map(|value| value.get())
                .unwrap_or(-1);
            let response = Response::new(200, "text/plain");
            ctx.connection()
                .send(&response, Body::Bytes(tag.to_string().into_bytes()))
                .map_err(HandlerError::Other)?;
            Ok(Input::with_consumer(Sink))
        }
    }

    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());
    server.context().add_procedure(Arc::new(Stamp)).unwrap();
    server.context().add_request_handler(Arc::new(ReadTag));
    server.initialize(&Default::default()).unwrap();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    let driven = listener.drive(HttpRequest::get("/x")).unwrap();
    assert_eq!(driven.body_text(), "41");

    // The registry is per request: the next request starts clean and the
    // procedure stamps it again without a duplicate-id failure.
    let driven = listener.drive(HttpRequest::get("/x")).unwrap();
    assert_eq!(driven.body_text(), "41");
}

#[test]
fn virtual_hosts_select_by_hostname() {
    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());

    let host = HttpContext::host("*.api.example.org");
    host.add_request_handler(Arc::new(EchoPath));
    server.context().add_child(host, true);
    server.initialize(&Default::default()).unwrap();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    let hit = listener
        .drive(HttpRequest::get("/ping").with_host("eu.api.example.org"))
        .unwrap();
    assert!(hit.accepted);

    let miss = listener
        .drive(HttpRequest::get("/ping").with_host("www.example.org"))
        .unwrap();
    assert!(!miss.accepted);
    assert_eq!(miss.status(), Some(404));
}
