// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport contract.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gantry_core::BoxError;

use crate::io::Input;

/// One inbound request, as parsed by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    /// Absolute request path, beginning with `/`.
    pub path: String,
    /// Host the client addressed, without port.
    pub host_name: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Transport metadata (remote address, scheme, ...).
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            host_name: String::new(),
            headers: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_host(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = host_name.into();
        self
    }
}

/// Response head sent back through a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub headers: BTreeMap<String, String>,
}

impl Response {
    pub fn new(status: u16, content_type: impl Into<String>) -> Self {
        Self { status, content_type: content_type.into(), headers: BTreeMap::new() }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Response body. Files are streamed by the transport so large error
/// documents never pass through engine memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Write side of one client connection.
pub trait Connection: Send {
    fn send(&mut self, response: &Response, body: Body) -> Result<(), BoxError>;
}

/// The engine-side entry point a transport drives for every request.
pub trait HttpDispatcher: Send + Sync {
    fn dispatch(&self, request: HttpRequest, connection: &mut dyn Connection) -> Input;
}

/// TLS material for one virtual host, handed to HTTPS transports.
#[derive(Debug, Clone)]
pub struct TlsHost {
    pub hostname: String,
    pub key: Vec<u8>,
    pub certificate: Vec<u8>,
}

/// A bound HTTP listener.
///
/// `listen` starts accepting and returns; the transport owns its accept
/// threads. `on_release` fires exactly once when the listener has stopped,
/// whether through [`HttpListener::release`] or a transport-side failure.
pub trait HttpListener: Send + Sync {
    fn listen(
        &self,
        dispatcher: Arc<dyn HttpDispatcher>,
        on_release: Box<dyn FnOnce() + Send>,
    ) -> Result<(), BoxError>;

    /// Stop accepting; in-flight requests finish first.
    fn release(&self);

    /// Install per-host TLS material. Only meaningful for HTTPS
    /// transports; the default rejects the call.
    fn set_tls_hosts(&self, hosts: Vec<TlsHost>) -> Result<(), BoxError> {
        let _ = hosts;
        Err("transport does not support TLS".into())
    }
}
