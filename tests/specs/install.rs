// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration installation end to end, including load failures.

use crate::prelude::*;

use gantry_config::{install, ConfigError, MainConfig};
use gantry_core::{Object, Value};
use gantry_engine::PluginSet;
use gantry_transport::HttpListener as _;

fn plugins(listener: Arc<LocalHttpListener>) -> PluginSet {
    let mut plugins = PluginSet::new();
    plugins.register_object("value", |_| Ok(Arc::new(Value::new(0i32)) as Arc<dyn Object>));
    plugins.register_http_handler("echo-path", |_| Ok(Arc::new(EchoPath) as _));
    plugins.register_http_listener("local-http", move |_| Ok(listener.clone() as _));
    plugins
}

/// The parsed form of a small deployment: one HTTP server with a nested
/// endpoint tree. Serde stands in for the external configuration parser.
fn routed_config() -> MainConfig {
    serde_json::from_value(serde_json::json!({
        "entries": [
            {
                "type": "server",
                "kind": "http",
                "implementation": "local-http",
                "entries": [
                    {
                        "type": "endpoint",
                        "path": "/api",
                        "entries": [
                            {
                                "type": "endpoint",
                                "path": "/v1",
                                "entries": [
                                    { "type": "request-handler", "implementation": "echo-path" }
                                ]
                            }
                        ]
                    }
                ]
            }
        ]
    }))
    .unwrap()
}

#[test]
fn a_parsed_configuration_installs_and_serves() {
    let listener = LocalHttpListener::new();
    let main = install(&routed_config(), &plugins(listener.clone()), quiet_options()).unwrap();

    let runner = spawn_main(&main);
    assert!(wait_until(|| listener.is_listening(), Duration::from_secs(2)));

    let driven = listener.drive(HttpRequest::get("/api/v1/ping")).unwrap();
    assert_eq!(driven.body_text(), "/ping");

    (Arc::clone(&main) as Arc<dyn Procedure>).cancel();
    runner.join().unwrap().unwrap();
}

#[test]
fn an_unresolved_reference_aborts_the_load_before_anything_starts() {
    let listener = LocalHttpListener::new();

    let config: MainConfig = serde_json::from_value(serde_json::json!({
        "entries": [
            {
                "type": "reference",
                "id": "db",
                "ref_id": "db-main",
                "position": { "file": "main.xml", "line": 12 }
            },
            {
                "type": "server",
                "kind": "http",
                "implementation": "local-http",
                "entries": []
            }
        ]
    }))
    .unwrap();

    let err = install(&config, &plugins(listener.clone()), quiet_options()).unwrap_err();
    match err {
        ConfigError::ObjectNotFound { ref_id, position } => {
            assert_eq!(ref_id, "db-main");
            assert_eq!(position.to_string(), "main.xml:12");
        }
        other => panic!("unexpected error: {other}"),
    }

    // No server was started.
    assert!(!listener.is_listening());
}

#[test]
fn released_listeners_stop_serving_mid_flight() {
    let listener = LocalHttpListener::new();
    let main = install(&routed_config(), &plugins(listener.clone()), quiet_options()).unwrap();

    let runner = spawn_main(&main);
    assert!(wait_until(|| listener.is_listening(), Duration::from_secs(2)));

    listener.release();
    runner.join().unwrap().unwrap();
    assert!(listener.drive(HttpRequest::get("/api/v1/ping")).is_err());
}
