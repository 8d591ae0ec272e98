// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation-driven shutdown.
//!
//! The signal-delivery variant lives in `tests/signal_shutdown.rs`
//! (harness-free); these specs exercise the same cancellation path
//! directly.

use crate::prelude::*;

#[test]
fn cancel_releases_the_servers_and_returns_from_run() {
    let listener = LocalHttpListener::new();
    let main = Main::new(quiet_options());
    let server = HttpServer::new(listener.clone(), false, Arc::clone(main.registry()));
    server.context().add_request_handler(Arc::new(EchoPath));
    main.add_http_server(server);

    let runner = spawn_main(&main);
    assert!(wait_until(|| listener.is_listening(), Duration::from_secs(2)));

    // The server answers while running.
    let driven = listener.drive(HttpRequest::get("/ping")).unwrap();
    assert_eq!(driven.status(), Some(200));

    (Arc::clone(&main) as Arc<dyn Procedure>).cancel();

    assert!(listener.wait_released(Duration::from_secs(5)));
    runner.join().unwrap().unwrap();
    assert_eq!(main.registry().running_count(), 0);

    // Once release began, no request is served.
    assert!(listener.drive(HttpRequest::get("/ping")).is_err());
}

#[test]
fn repeated_cancels_are_idempotent_for_shutdown() {
    let listener = LocalHttpListener::new();
    let main = Main::new(quiet_options());
    let server = HttpServer::new(listener.clone(), false, Arc::clone(main.registry()));
    main.add_http_server(server);

    let runner = spawn_main(&main);
    assert!(wait_until(|| listener.is_listening(), Duration::from_secs(2)));

    for _ in 0..3 {
        (Arc::clone(&main) as Arc<dyn Procedure>).cancel();
    }
    runner.join().unwrap().unwrap();
    assert_eq!(main.registry().running_count(), 0);
}

#[test]
fn both_servers_stop_on_one_cancel() {
    use gantry_transport::local::LocalBasicListener;

    let http_listener = LocalHttpListener::new();
    let basic_listener = LocalBasicListener::new();
    let main = Main::new(quiet_options());
    main.add_http_server(HttpServer::new(
        http_listener.clone(),
        false,
        Arc::clone(main.registry()),
    ));
    main.add_basic_server(gantry_engine::BasicServer::new(
        basic_listener.clone(),
        Arc::clone(main.registry()),
    ));

    let runner = spawn_main(&main);
    assert!(wait_until(|| main.registry().running_count() == 2, Duration::from_secs(2)));

    (Arc::clone(&main) as Arc<dyn Procedure>).cancel();
    runner.join().unwrap().unwrap();
    assert!(http_listener.is_released());
    assert!(basic_listener.is_released());
}
