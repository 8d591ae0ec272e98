// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the integration specs.

pub use std::sync::Arc;
pub use std::time::Duration;

pub use gantry_core::{BoxError, ObjectRegistry, Procedure};
pub use gantry_engine::http::{HttpContext, RequestContext};
pub use gantry_engine::{
    HandlerError, HttpRequestHandler, HttpServer, Main, MainOptions, StatusError,
};
pub use gantry_transport::local::LocalHttpListener;
pub use gantry_transport::{Body, Consumer, HttpRequest, Input, Response};

pub struct Sink;

impl Consumer for Sink {
    fn consume(&mut self, _chunk: &[u8]) -> Result<bool, BoxError> {
        Ok(true)
    }
}

/// Handler answering 200 with the current (rewritten) request path.
pub struct EchoPath;

impl HttpRequestHandler for EchoPath {
    fn accept(&self, ctx: &mut RequestContext<'_>) -> Result<Input, HandlerError> {
        let body = ctx.path().to_string();
        let response = Response::new(200, "text/plain");
        ctx.connection()
            .send(&response, Body::Bytes(body.into_bytes()))
            .map_err(HandlerError::Other)?;
        Ok(Input::with_consumer(Sink))
    }
}

/// Handler rejecting every request with the given status code.
pub struct Throw(pub u16);

impl HttpRequestHandler for Throw {
    fn accept(&self, _ctx: &mut RequestContext<'_>) -> Result<Input, HandlerError> {
        Err(StatusError::new(self.0).into())
    }
}

/// Quiet supervisor options for specs that provoke failures.
pub fn quiet_options() -> MainOptions {
    MainOptions { dump_failure: false, ..MainOptions::default() }
}

/// Start `main` on its own thread.
pub fn spawn_main(main: &Arc<Main>) -> std::thread::JoinHandle<Result<(), BoxError>> {
    let main = Arc::clone(main);
    std::thread::spawn(move || (main as Arc<dyn Procedure>).run(&ObjectRegistry::new()))
}

pub fn wait_until(predicate: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}
