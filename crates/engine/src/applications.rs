// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-scanned sub-applications.
//!
//! An applications object owns a directory of self-contained
//! sub-applications. Each subdirectory carrying an application
//! configuration becomes an [`Application`]: its own object registry
//! (parented to the loader's context) with optional HTTP and basic
//! dispatch roots. The scan happens once, at initialize; changing the
//! directory requires a restart like any other configuration change.
//!
//! Configuration parsing stays outside the engine: an injected
//! [`ApplicationFactory`] turns a directory into an application.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use gantry_core::{BoxError, Initializable, Object, ObjectRegistry};
use gantry_transport::Input;

use crate::basic::{BasicContext, BasicRequestContext};
use crate::error::EngineError;
use crate::failure::HandlerError;
use crate::http::context::HttpContext;
use crate::http::request::RequestContext;
use crate::supervisor::ProcessRegistry;

/// One scanned sub-application.
pub struct Application {
    name: String,
    objects: Arc<ObjectRegistry>,
    http_root: Option<Arc<HttpContext>>,
    basic_root: Option<Arc<BasicContext>>,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: ObjectRegistry::new(),
            http_root: None,
            basic_root: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objects(&self) -> &Arc<ObjectRegistry> {
        &self.objects
    }

    pub fn set_http_root(&mut self, root: Arc<HttpContext>) {
        self.http_root = Some(root);
    }

    pub fn http_root(&self) -> Option<&Arc<HttpContext>> {
        self.http_root.as_ref()
    }

    pub fn set_basic_root(&mut self, root: Arc<BasicContext>) {
        self.basic_root = Some(root);
    }

    pub fn basic_root(&self) -> Option<&Arc<BasicContext>> {
        self.basic_root.as_ref()
    }

    fn initialize(&self) -> Result<(), BoxError> {
        self.objects.initialize()?;
        if let Some(http_root) = &self.http_root {
            http_root.initialize()?;
        }
        if let Some(basic_root) = &self.basic_root {
            basic_root.initialize()?;
        }
        Ok(())
    }
}

/// Turns one scanned directory into an application.
///
/// Returns `Ok(None)` when the directory carries no application
/// configuration; the loader warns and skips it.
pub trait ApplicationFactory: Send + Sync {
    fn load(
        &self,
        directory: &Path,
        parent: &Arc<ObjectRegistry>,
        registry: &Arc<ProcessRegistry>,
    ) -> Result<Option<Application>, BoxError>;
}

/// The scanning collection object. Registered in a context under an id
/// and referenced from HTTP or basic entry lists.
pub struct Applications {
    path: PathBuf,
    factory: Arc<dyn ApplicationFactory>,
    registry: Arc<ProcessRegistry>,
    applications: RwLock<BTreeMap<String, Arc<Application>>>,
}

impl Applications {
    pub fn new(
        path: impl Into<PathBuf>,
        factory: Arc<dyn ApplicationFactory>,
        registry: Arc<ProcessRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            factory,
            registry,
            applications: RwLock::new(BTreeMap::new()),
        })
    }

    /// Construct from configuration parameters; `path` is required and
    /// unique.
    pub fn from_settings(
        settings: &[(String, String)],
        factory: Arc<dyn ApplicationFactory>,
        registry: Arc<ProcessRegistry>,
    ) -> Result<Arc<Self>, EngineError> {
        let mut path: Option<PathBuf> = None;
        for (key, value) in settings {
            match key.as_str() {
                "path" => {
                    if path.is_some() {
                        return Err(EngineError::Settings(
                            "multiple definition of attribute 'path'".to_string(),
                        ));
                    }
                    if value.is_empty() {
                        return Err(EngineError::Settings(
                            "invalid value \"\" for attribute 'path'".to_string(),
                        ));
                    }
                    path = Some(PathBuf::from(value));
                }
                other => {
                    return Err(EngineError::Settings(format!(
                        "unknown parameter key=\"{other}\" with value=\"{value}\""
                    )));
                }
            }
        }
        let path =
            path.ok_or_else(|| EngineError::Settings("missing attribute 'path'".to_string()))?;
        Ok(Self::new(path, factory, registry))
    }

    /// Scanned applications by name.
    pub fn applications(&self) -> BTreeMap<String, Arc<Application>> {
        self.applications.read().clone()
    }

    /// Union of the basic notifier sets across all applications.
    pub fn basic_notifiers(&self) -> BTreeSet<String> {
        let mut notifiers = BTreeSet::new();
        for application in self.applications.read().values() {
            if let Some(basic_root) = application.basic_root() {
                notifiers.extend(basic_root.notifiers());
            }
        }
        notifiers
    }

    /// Offer the request to each application's HTTP root, in name order;
    /// first non-empty input wins. `name` filters to one application.
    pub fn dispatch_http(
        &self,
        ctx: &mut RequestContext<'_>,
        name: Option<&str>,
    ) -> Result<Input, HandlerError> {
        let applications = self.applications();
        for (app_name, application) in &applications {
            if let Some(filter) = name {
                if filter != app_name {
                    continue;
                }
            }
            if let Some(http_root) = application.http_root() {
                let input = http_root.accept(ctx)?;
                if !input.is_empty() {
                    return Ok(input);
                }
            }
        }
        Ok(Input::empty())
    }

    /// Basic-protocol analogue of [`Applications::dispatch_http`].
    pub fn dispatch_basic(
        &self,
        ctx: &mut BasicRequestContext,
        name: Option<&str>,
    ) -> Result<Input, HandlerError> {
        let applications = self.applications();
        for (app_name, application) in &applications {
            if let Some(filter) = name {
                if filter != app_name {
                    continue;
                }
            }
            if let Some(basic_root) = application.basic_root() {
                let input = basic_root.accept(ctx)?;
                if !input.is_empty() {
                    return Ok(input);
                }
            }
        }
        Ok(Input::empty())
    }

    fn scan(&self, owner: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        let entries = std::fs::read_dir(&self.path)
            .map_err(|err| format!("cannot scan \"{}\": {err}", self.path.display()))?;

        let mut directories: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        directories.sort();

        for directory in directories {
            let name = match directory.file_name().and_then(|name| name.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            match self.factory.load(&directory, owner, &self.registry)? {
                Some(application) => {
                    application.initialize()?;
                    info!(application = %name, "application loaded");
                    self.applications.write().insert(name, Arc::new(application));
                }
                None => {
                    warn!(directory = %directory.display(), "no application configuration found; skipping");
                }
            }
        }
        Ok(())
    }
}

impl Object for Applications {
    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }
}

impl Initializable for Applications {
    fn initialize(&self, owner: &Arc<ObjectRegistry>) -> Result<(), BoxError> {
        if !self.applications.read().is_empty() {
            return Ok(());
        }
        self.scan(owner)
    }
}

#[cfg(test)]
#[path = "applications_tests.rs"]
mod tests;
