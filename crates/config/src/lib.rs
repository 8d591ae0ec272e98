// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-config: declarative configuration model and installer.
//!
//! Parsing the configuration syntax (XML in the reference deployment) is
//! external; this crate consumes the parsed in-memory tree described by
//! [`model::MainConfig`] and turns it into a configured
//! [`Main`](gantry_engine::Main) supervisor through the
//! [`Plugins`](gantry_engine::Plugins) factory contract.

pub mod apps;
pub mod error;
pub mod install;
pub mod model;
pub mod settings;

pub use apps::{ApplicationConfig, BasicAppDecl, ConfigApplicationFactory, HttpAppDecl};
pub use error::ConfigError;
pub use install::install;
pub use model::{
    CertificateDecl, ContextDecl, DocLanguage, DocumentDecl, EndpointDecl, EntryDecl,
    ExceptionsDecl, HeaderDecl, HostDecl, LibraryDecl, MainConfig, ObjectDecl, Parameter,
    ProcedureDecl, ReferenceDecl, RequestHandlerDecl, ServerDecl, ServerKind, TopLevelDecl,
    ValueLanguage,
};
pub use settings::{parse_settings, MainSettings, SettingsError};
