// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response-header inheritance, including on the failure path.

use crate::prelude::*;

use gantry_engine::ProcessRegistry;

#[test]
fn failure_responses_carry_the_nearest_effective_headers() {
    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());

    server.context().add_header("X-Server", "root");

    let api = HttpContext::endpoint("/api");
    api.add_header("X-Server", "api");
    api.add_header("X-Api", "1");
    api.add_request_handler(Arc::new(Throw(404)));
    server.context().add_child(api, true);

    server.initialize(&Default::default()).unwrap();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    let driven = listener.drive(HttpRequest::get("/api/missing")).unwrap();
    assert_eq!(driven.status(), Some(404));
    // Local override wins over the root value; the sibling addition rides
    // along.
    assert_eq!(driven.header("X-Server"), Some("api"));
    assert_eq!(driven.header("X-Api"), Some("1"));
    assert!(driven.body_text().contains("404"));
}

#[test]
fn requests_outside_the_endpoint_see_the_root_headers() {
    let listener = LocalHttpListener::new();
    let server = HttpServer::new(listener.clone(), false, ProcessRegistry::new());

    server.context().add_header("X-Server", "root");

    let api = HttpContext::endpoint("/api");
    api.add_header("X-Server", "api");
    api.add_request_handler(Arc::new(Throw(404)));
    server.context().add_child(api, true);

    server.initialize(&Default::default()).unwrap();
    (server.clone() as Arc<dyn Procedure>).run(&ObjectRegistry::new()).unwrap();

    // 404 synthesized at the root: only the root headers apply.
    let driven = listener.drive(HttpRequest::get("/other")).unwrap();
    assert_eq!(driven.status(), Some(404));
    assert_eq!(driven.header("X-Server"), Some("root"));
    assert_eq!(driven.header("X-Api"), None);
}
