// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration-time error taxonomy.
//!
//! All of these are fatal at load: the process does not start. Every
//! variant carries the position of the offending declaration.

use thiserror::Error;

use gantry_core::{FilePosition, RegistryError};
use gantry_engine::{EngineError, PluginError, PluginNotFound};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{position}: multiple definition of attribute '{name}'")]
    DuplicateAttribute { name: String, position: FilePosition },

    #[error("{position}: unknown attribute '{name}'")]
    UnknownAttribute { name: String, position: FilePosition },

    #[error("{position}: missing attribute '{name}'")]
    MissingAttribute { name: String, position: FilePosition },

    #[error("{position}: invalid value \"{value}\" for attribute '{name}'")]
    InvalidValue { name: String, value: String, position: FilePosition },

    #[error("{position}: {source}")]
    PluginNotFound {
        #[source]
        source: PluginNotFound,
        position: FilePosition,
    },

    #[error("{position}: {source}")]
    PluginFailed {
        #[source]
        source: PluginError,
        position: FilePosition,
    },

    #[error("{position}: ambiguous definition of endpoint \"{path}\"")]
    AmbiguousEndpoint { path: String, position: FilePosition },

    #[error("{position}: cyclic reference to '{id}'")]
    CyclicReference { id: String, position: FilePosition },

    #[error("{position}: no object found with ref-id '{ref_id}'")]
    ObjectNotFound { ref_id: String, position: FilePosition },

    #[error("{position}: {source}")]
    Engine {
        #[source]
        source: EngineError,
        position: FilePosition,
    },

    #[error("{position}: {source}")]
    Registry {
        #[source]
        source: RegistryError,
        position: FilePosition,
    },
}

impl ConfigError {
    /// Position the error points at.
    pub fn position(&self) -> &FilePosition {
        match self {
            ConfigError::DuplicateAttribute { position, .. }
            | ConfigError::UnknownAttribute { position, .. }
            | ConfigError::MissingAttribute { position, .. }
            | ConfigError::InvalidValue { position, .. }
            | ConfigError::PluginNotFound { position, .. }
            | ConfigError::PluginFailed { position, .. }
            | ConfigError::AmbiguousEndpoint { position, .. }
            | ConfigError::CyclicReference { position, .. }
            | ConfigError::ObjectNotFound { position, .. }
            | ConfigError::Engine { position, .. }
            | ConfigError::Registry { position, .. } => position,
        }
    }

    pub(crate) fn from_engine(source: EngineError, position: &FilePosition) -> Self {
        match source {
            EngineError::ObjectNotFound(ref_id) => {
                ConfigError::ObjectNotFound { ref_id, position: position.clone() }
            }
            EngineError::Registry(source) => {
                ConfigError::Registry { source, position: position.clone() }
            }
            source => ConfigError::Engine { source, position: position.clone() },
        }
    }

    pub(crate) fn from_plugin(source: PluginError, position: &FilePosition) -> Self {
        match source {
            PluginError::NotFound(source) => {
                ConfigError::PluginNotFound { source, position: position.clone() }
            }
            source => ConfigError::PluginFailed { source, position: position.clone() },
        }
    }

    pub(crate) fn from_registry(source: RegistryError, position: &FilePosition) -> Self {
        match source {
            RegistryError::NotFound(ref_id) => {
                ConfigError::ObjectNotFound { ref_id, position: position.clone() }
            }
            source => ConfigError::Registry { source, position: position.clone() },
        }
    }
}
