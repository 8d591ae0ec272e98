// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application configuration model and loader bridge.
//!
//! Each scanned application directory parses into an
//! [`ApplicationConfig`]: its own objects plus optional HTTP and basic
//! dispatch roots. [`ConfigApplicationFactory`] adapts that model to the
//! engine's [`ApplicationFactory`] contract; the file-format parser is a
//! pluggable function, like the main configuration parser.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gantry_core::{BoxError, FilePosition, ObjectRegistry};
use gantry_engine::basic::BasicContext;
use gantry_engine::http::HttpContext;
use gantry_engine::{Application, ApplicationFactory, Plugins, ProcessRegistry};

use crate::error::ConfigError;
use crate::install::{build_basic_entries, build_http_entries};
use crate::model::{EntryDecl, ExceptionsDecl, HeaderDecl, TopLevelDecl};

/// Parsed configuration of one application directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Object, reference and named-procedure declarations.
    #[serde(default)]
    pub objects: Vec<TopLevelDecl>,
    #[serde(default)]
    pub http: Option<HttpAppDecl>,
    #[serde(default)]
    pub basic: Option<BasicAppDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpAppDecl {
    #[serde(default = "crate::apps::default_true")]
    pub inherit: bool,
    #[serde(default)]
    pub response_headers: Vec<HeaderDecl>,
    #[serde(default)]
    pub exceptions: Option<ExceptionsDecl>,
    #[serde(default)]
    pub entries: Vec<EntryDecl>,
    #[serde(default)]
    pub position: FilePosition,
}

impl Default for HttpAppDecl {
    fn default() -> Self {
        Self {
            inherit: true,
            response_headers: Vec::new(),
            exceptions: None,
            entries: Vec::new(),
            position: FilePosition::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicAppDecl {
    #[serde(default = "crate::apps::default_true")]
    pub inherit: bool,
    #[serde(default)]
    pub entries: Vec<EntryDecl>,
    #[serde(default)]
    pub position: FilePosition,
}

impl Default for BasicAppDecl {
    fn default() -> Self {
        Self { inherit: true, entries: Vec::new(), position: FilePosition::default() }
    }
}

pub(crate) fn default_true() -> bool {
    true
}

/// Parses an application directory into its configuration model, or
/// `None` when the directory carries no application configuration.
pub type AppConfigParser =
    dyn Fn(&Path) -> Result<Option<ApplicationConfig>, ConfigError> + Send + Sync;

/// [`ApplicationFactory`] over the configuration model.
pub struct ConfigApplicationFactory {
    plugins: Arc<dyn Plugins>,
    parser: Box<AppConfigParser>,
}

impl ConfigApplicationFactory {
    pub fn new(
        plugins: Arc<dyn Plugins>,
        parser: impl Fn(&Path) -> Result<Option<ApplicationConfig>, ConfigError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self { plugins, parser: Box::new(parser) })
    }

    fn build(
        &self,
        name: &str,
        config: &ApplicationConfig,
        parent: &Arc<ObjectRegistry>,
    ) -> Result<Application, ConfigError> {
        let mut application = Application::new(name);
        application.objects().set_parent(parent);

        for declaration in &config.objects {
            match declaration {
                TopLevelDecl::Object(decl) => {
                    crate::install::install_object(
                        application.objects(),
                        decl,
                        self.plugins.as_ref(),
                    )?;
                }
                TopLevelDecl::Reference(decl) => {
                    crate::install::install_reference(application.objects(), decl)?;
                }
                TopLevelDecl::Procedure(decl) => {
                    crate::install::install_named_procedure(
                        application.objects(),
                        decl,
                        self.plugins.as_ref(),
                    )?;
                }
                TopLevelDecl::Server(decl) => {
                    return Err(ConfigError::UnknownAttribute {
                        name: "server".to_string(),
                        position: decl.position.clone(),
                    });
                }
                TopLevelDecl::Context(decl) => {
                    return Err(ConfigError::UnknownAttribute {
                        name: "context".to_string(),
                        position: decl.position.clone(),
                    });
                }
            }
        }

        if let Some(http) = &config.http {
            let root = HttpContext::new();
            if http.inherit {
                root.objects().set_parent(application.objects());
            }
            for header in &http.response_headers {
                root.add_header(&header.key, &header.value);
            }
            crate::install::apply_exceptions(&root, http.exceptions.as_ref())?;

            let mut endpoints = BTreeSet::new();
            let mut stack = vec![Arc::as_ptr(&root) as usize];
            build_http_entries(
                &root,
                &http.entries,
                self.plugins.as_ref(),
                &mut endpoints,
                "",
                &mut stack,
            )?;
            application.set_http_root(root);
        }

        if let Some(basic) = &config.basic {
            let root = BasicContext::new();
            if basic.inherit {
                root.objects().set_parent(application.objects());
            }
            let mut stack = vec![Arc::as_ptr(&root) as usize];
            build_basic_entries(&root, &basic.entries, self.plugins.as_ref(), &mut stack)?;
            application.set_basic_root(root);
        }

        Ok(application)
    }
}

impl ApplicationFactory for ConfigApplicationFactory {
    fn load(
        &self,
        directory: &Path,
        parent: &Arc<ObjectRegistry>,
        _registry: &Arc<ProcessRegistry>,
    ) -> Result<Option<Application>, BoxError> {
        let Some(config) = (self.parser)(directory)? else {
            return Ok(None);
        };
        let name = directory
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| BoxError::from("application directory has no readable name"))?;
        let application = self.build(name, &config, parent)?;
        Ok(Some(application))
    }
}

#[cfg(test)]
#[path = "apps_tests.rs"]
mod tests;
