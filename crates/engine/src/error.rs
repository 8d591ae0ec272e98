// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Initialization-time errors.
//!
//! Everything here is fatal: it aborts [`Main::run`](crate::Main::run)
//! before any procedure starts.

use std::path::PathBuf;

use thiserror::Error;

use gantry_core::RegistryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no object found with ref-id '{0}'")]
    ObjectNotFound(String),

    #[error("object with ref-id '{0}' is not a procedure")]
    NotAProcedure(String),

    #[error("object with ref-id '{0}' is not a context")]
    NotAContext(String),

    #[error("no certificates are available")]
    MissingCertificate,

    #[error("there are multiple error documents defined for http status code \"{0}\"")]
    DuplicateErrorDocument(u16),

    #[error("cannot open {kind} file \"{path}\"")]
    CertificateIo {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Settings(String),

    #[error("{0}")]
    Setup(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
