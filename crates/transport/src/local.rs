// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous in-memory transports for tests.
//!
//! `LocalHttpListener` and `LocalBasicListener` implement the listener
//! contracts without any I/O: tests push requests in with `drive` and get
//! the captured response back. `release` runs the engine-supplied release
//! hook exactly once, so server-wrapper lifecycle tests work against the
//! real contract.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use gantry_core::BoxError;

use crate::basic::{BasicDispatcher, BasicListener, BasicRequest};
use crate::http::{Body, Connection, HttpDispatcher, HttpListener, HttpRequest, Response, TlsHost};
use crate::io::Input;

/// What one driven request produced.
pub struct Driven {
    /// Response head sent on the connection, if any.
    pub response: Option<Response>,
    /// Response body sent with it.
    pub body: Option<Body>,
    /// Whether the dispatcher accepted the request (non-empty input).
    pub accepted: bool,
}

impl Driven {
    /// Response body as UTF-8 text, empty when none was sent.
    pub fn body_text(&self) -> String {
        match &self.body {
            Some(Body::Bytes(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
            _ => String::new(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|response| response.status)
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.response.as_ref().and_then(|response| response.headers.get(key)).map(String::as_str)
    }
}

/// Connection capturing the single response a request produces.
#[derive(Default)]
pub struct CapturedConnection {
    pub sent: Option<(Response, Body)>,
}

impl Connection for CapturedConnection {
    fn send(&mut self, response: &Response, body: Body) -> Result<(), BoxError> {
        self.sent = Some((response.clone(), body));
        Ok(())
    }
}

struct HttpState {
    dispatcher: Option<Arc<dyn HttpDispatcher>>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
    released: bool,
    tls_hosts: Vec<TlsHost>,
    tls_supported: bool,
}

/// In-memory HTTP listener.
pub struct LocalHttpListener {
    state: Mutex<HttpState>,
    release_cv: Condvar,
}

impl LocalHttpListener {
    pub fn new() -> Arc<Self> {
        Self::with_tls_support(false)
    }

    /// A listener that accepts TLS material, standing in for an HTTPS
    /// transport.
    pub fn with_tls_support(tls_supported: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HttpState {
                dispatcher: None,
                on_release: None,
                released: false,
                tls_hosts: Vec::new(),
                tls_supported,
            }),
            release_cv: Condvar::new(),
        })
    }

    /// Dispatch one request without a body.
    pub fn drive(&self, request: HttpRequest) -> Result<Driven, BoxError> {
        self.drive_with_body(request, &[])
    }

    /// Dispatch one request, feeding `chunks` into the returned input.
    pub fn drive_with_body(&self, request: HttpRequest, chunks: &[&[u8]]) -> Result<Driven, BoxError> {
        let dispatcher = {
            let state = self.state.lock();
            state.dispatcher.clone().ok_or("listener is not listening")?
        };

        let mut connection = CapturedConnection::default();
        let input = dispatcher.dispatch(request, &mut connection);
        let accepted = !input.is_empty();

        if let Some(mut consumer) = input.into_consumer() {
            for chunk in chunks {
                if !consumer.consume(chunk)? {
                    break;
                }
            }
            consumer.finish()?;
        }

        let (response, body) = match connection.sent {
            Some((response, body)) => (Some(response), Some(body)),
            None => (None, None),
        };
        Ok(Driven { response, body, accepted })
    }

    pub fn is_listening(&self) -> bool {
        self.state.lock().dispatcher.is_some()
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    /// Block until `release` has run, up to `timeout`.
    pub fn wait_released(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.released {
            if self.release_cv.wait_until(&mut state, deadline).timed_out() {
                return state.released;
            }
        }
        true
    }

    pub fn tls_hosts(&self) -> Vec<TlsHost> {
        self.state.lock().tls_hosts.clone()
    }
}

impl HttpListener for LocalHttpListener {
    fn listen(
        &self,
        dispatcher: Arc<dyn HttpDispatcher>,
        on_release: Box<dyn FnOnce() + Send>,
    ) -> Result<(), BoxError> {
        let mut state = self.state.lock();
        if state.dispatcher.is_some() {
            return Err("listener is already listening".into());
        }
        state.dispatcher = Some(dispatcher);
        state.on_release = Some(on_release);
        state.released = false;
        Ok(())
    }

    fn release(&self) {
        let hook = {
            let mut state = self.state.lock();
            state.dispatcher = None;
            state.released = true;
            self.release_cv.notify_all();
            state.on_release.take()
        };
        if let Some(hook) = hook {
            debug!("local http listener released");
            hook();
        }
    }

    fn set_tls_hosts(&self, hosts: Vec<TlsHost>) -> Result<(), BoxError> {
        let mut state = self.state.lock();
        if !state.tls_supported {
            return Err("transport does not support TLS".into());
        }
        state.tls_hosts = hosts;
        Ok(())
    }
}

struct BasicState {
    dispatcher: Option<Arc<dyn BasicDispatcher>>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
    notifiers: BTreeSet<String>,
    released: bool,
}

/// In-memory basic-protocol listener.
pub struct LocalBasicListener {
    state: Mutex<BasicState>,
}

impl LocalBasicListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BasicState {
                dispatcher: None,
                on_release: None,
                notifiers: BTreeSet::new(),
                released: false,
            }),
        })
    }

    /// Dispatch one message; returns whether a handler accepted it.
    pub fn drive(&self, request: BasicRequest) -> Result<bool, BoxError> {
        self.drive_with_payload(request, &[])
    }

    /// Dispatch one message, feeding `chunks` into the returned input.
    pub fn drive_with_payload(&self, request: BasicRequest, chunks: &[&[u8]]) -> Result<bool, BoxError> {
        let dispatcher = {
            let state = self.state.lock();
            state.dispatcher.clone().ok_or("listener is not listening")?
        };

        let input = dispatcher.dispatch(request);
        let accepted = !input.is_empty();
        if let Some(mut consumer) = input.into_consumer() {
            for chunk in chunks {
                if !consumer.consume(chunk)? {
                    break;
                }
            }
            consumer.finish()?;
        }
        Ok(accepted)
    }

    /// Notifier set the server advertised at listen time.
    pub fn notifiers(&self) -> BTreeSet<String> {
        self.state.lock().notifiers.clone()
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }
}

impl BasicListener for LocalBasicListener {
    fn listen(
        &self,
        notifiers: BTreeSet<String>,
        dispatcher: Arc<dyn BasicDispatcher>,
        on_release: Box<dyn FnOnce() + Send>,
    ) -> Result<(), BoxError> {
        let mut state = self.state.lock();
        if state.dispatcher.is_some() {
            return Err("listener is already listening".into());
        }
        state.notifiers = notifiers;
        state.dispatcher = Some(dispatcher);
        state.on_release = Some(on_release);
        state.released = false;
        Ok(())
    }

    fn release(&self) {
        let hook = {
            let mut state = self.state.lock();
            state.dispatcher = None;
            state.released = true;
            state.on_release.take()
        };
        if let Some(hook) = hook {
            debug!("local basic listener released");
            hook();
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
