// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin factory contract.
//!
//! The engine consumes implementations by name: the configuration names an
//! implementation id, the plugin registry turns it into an object, request
//! handler or listener. [`PluginSet`] is the map-backed registry the
//! embedding process fills at startup; alternative registries (dynamic
//! libraries, test doubles) only need to satisfy [`Plugins`].

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use gantry_core::Object;
use gantry_transport::{BasicListener, HttpListener};

use crate::basic::BasicRequestHandler;
use crate::http::HttpRequestHandler;

/// Key/value parameters from the configuration, in declaration order.
pub type Settings = [(String, String)];

/// Requested implementation id is not registered. Carries the registered
/// ids so the error message can point at what *is* available.
#[derive(Debug, Clone, Error)]
#[error("no {kind} implementation \"{requested}\" available")]
pub struct PluginNotFound {
    pub kind: &'static str,
    pub requested: String,
    pub available: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    NotFound(#[from] PluginNotFound),

    #[error("creating \"{implementation}\" failed: {message}")]
    Failed { implementation: String, message: String },
}

/// Factory contract consumed by the configuration installer.
pub trait Plugins: Send + Sync {
    fn create_object(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn Object>, PluginError>;

    fn create_http_handler(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn HttpRequestHandler>, PluginError>;

    fn create_basic_handler(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn BasicRequestHandler>, PluginError>;

    fn create_http_listener(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn HttpListener>, PluginError>;

    fn create_basic_listener(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn BasicListener>, PluginError>;
}

type Factory<T> = Box<dyn Fn(&Settings) -> Result<T, PluginError> + Send + Sync>;

/// Map-backed plugin registry.
#[derive(Default)]
pub struct PluginSet {
    objects: BTreeMap<String, Factory<Arc<dyn Object>>>,
    http_handlers: BTreeMap<String, Factory<Arc<dyn HttpRequestHandler>>>,
    basic_handlers: BTreeMap<String, Factory<Arc<dyn BasicRequestHandler>>>,
    http_listeners: BTreeMap<String, Factory<Arc<dyn HttpListener>>>,
    basic_listeners: BTreeMap<String, Factory<Arc<dyn BasicListener>>>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_object(
        &mut self,
        implementation: impl Into<String>,
        factory: impl Fn(&Settings) -> Result<Arc<dyn Object>, PluginError> + Send + Sync + 'static,
    ) {
        self.objects.insert(implementation.into(), Box::new(factory));
    }

    pub fn register_http_handler(
        &mut self,
        implementation: impl Into<String>,
        factory: impl Fn(&Settings) -> Result<Arc<dyn HttpRequestHandler>, PluginError>
            + Send
            + Sync
            + 'static,
    ) {
        self.http_handlers.insert(implementation.into(), Box::new(factory));
    }

    pub fn register_basic_handler(
        &mut self,
        implementation: impl Into<String>,
        factory: impl Fn(&Settings) -> Result<Arc<dyn BasicRequestHandler>, PluginError>
            + Send
            + Sync
            + 'static,
    ) {
        self.basic_handlers.insert(implementation.into(), Box::new(factory));
    }

    pub fn register_http_listener(
        &mut self,
        implementation: impl Into<String>,
        factory: impl Fn(&Settings) -> Result<Arc<dyn HttpListener>, PluginError>
            + Send
            + Sync
            + 'static,
    ) {
        self.http_listeners.insert(implementation.into(), Box::new(factory));
    }

    pub fn register_basic_listener(
        &mut self,
        implementation: impl Into<String>,
        factory: impl Fn(&Settings) -> Result<Arc<dyn BasicListener>, PluginError>
            + Send
            + Sync
            + 'static,
    ) {
        self.basic_listeners.insert(implementation.into(), Box::new(factory));
    }

    /// Registered implementation ids per kind, for the verbose startup dump.
    pub fn dump(&self) {
        for (kind, ids) in [
            ("object", self.objects.keys().cloned().collect::<Vec<_>>()),
            ("http-handler", self.http_handlers.keys().cloned().collect()),
            ("basic-handler", self.basic_handlers.keys().cloned().collect()),
            ("http-listener", self.http_listeners.keys().cloned().collect()),
            ("basic-listener", self.basic_listeners.keys().cloned().collect()),
        ] {
            for id in ids {
                tracing::info!("plugin {kind}: \"{id}\"");
            }
        }
    }

    fn create<T>(
        kind: &'static str,
        factories: &BTreeMap<String, Factory<T>>,
        implementation: &str,
        settings: &Settings,
    ) -> Result<T, PluginError> {
        trace!(kind, implementation, "creating plugin instance");
        let factory = factories.get(implementation).ok_or_else(|| PluginNotFound {
            kind,
            requested: implementation.to_string(),
            available: factories.keys().cloned().collect(),
        })?;
        factory(settings)
    }
}

impl Plugins for PluginSet {
    fn create_object(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn Object>, PluginError> {
        Self::create("object", &self.objects, implementation, settings)
    }

    fn create_http_handler(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn HttpRequestHandler>, PluginError> {
        Self::create("http-handler", &self.http_handlers, implementation, settings)
    }

    fn create_basic_handler(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn BasicRequestHandler>, PluginError> {
        Self::create("basic-handler", &self.basic_handlers, implementation, settings)
    }

    fn create_http_listener(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn HttpListener>, PluginError> {
        Self::create("http-listener", &self.http_listeners, implementation, settings)
    }

    fn create_basic_listener(
        &self,
        implementation: &str,
        settings: &Settings,
    ) -> Result<Arc<dyn BasicListener>, PluginError> {
        Self::create("basic-listener", &self.basic_listeners, implementation, settings)
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
