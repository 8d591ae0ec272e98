// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsed configuration tree.
//!
//! Every node carries the [`FilePosition`] it was declared at so that
//! installation failures point back into the configuration source.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use gantry_core::FilePosition;

/// Root of a parsed main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MainConfig {
    #[serde(default)]
    pub libraries: Vec<LibraryDecl>,
    #[serde(default)]
    pub certificates: Vec<CertificateDecl>,
    #[serde(default)]
    pub entries: Vec<TopLevelDecl>,
}

/// Plugin library to load before the object graph is built. Loading is the
/// embedder's job; the installer only records the declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryDecl {
    pub path: String,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub position: FilePosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateDecl {
    pub hostname: String,
    pub key_file: PathBuf,
    pub cert_file: PathBuf,
    #[serde(default)]
    pub position: FilePosition,
}

/// A declaration at the top level of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TopLevelDecl {
    Object(ObjectDecl),
    Procedure(ProcedureDecl),
    Server(ServerDecl),
    Context(ContextDecl),
    Reference(ReferenceDecl),
}

/// A parameter value. Values tagged `builtin-script` are marked for
/// interpolation at evaluation time; the engine passes them through
/// literally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub language: ValueLanguage,
}

impl Parameter {
    pub fn plain(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into(), language: ValueLanguage::Plain }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueLanguage {
    #[default]
    Plain,
    BuiltinScript,
}

/// Flatten parameters into the key/value pairs the plugin contract takes.
pub(crate) fn to_pairs(parameters: &[Parameter]) -> Vec<(String, String)> {
    parameters.iter().map(|p| (p.key.clone(), p.value.clone())).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDecl {
    pub id: String,
    pub implementation: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub position: FilePosition,
}

/// A procedure: either created from an implementation (optionally
/// registered under `id`) or a reference to one registered elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcedureDecl {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub implementation: Option<String>,
    #[serde(default)]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub position: FilePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerKind {
    Http,
    Https,
    Basic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDecl {
    pub kind: ServerKind,
    pub implementation: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Whether the server's root context resolves object lookups through
    /// the main context.
    #[serde(default = "default_true")]
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderDecl {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub position: FilePosition,
}

/// Error handling of one context subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionsDecl {
    #[serde(default = "default_true")]
    pub inherit_documents: bool,
    #[serde(default)]
    pub show_exceptions: Option<bool>,
    #[serde(default)]
    pub show_stacktrace: Option<bool>,
    #[serde(default)]
    pub documents: Vec<DocumentDecl>,
    #[serde(default)]
    pub position: FilePosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDecl {
    pub status_code: u16,
    pub path: String,
    #[serde(default)]
    pub language: DocLanguage,
    #[serde(default)]
    pub position: FilePosition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocLanguage {
    #[default]
    None,
    BuiltinScript,
}

/// An element of a context's (or server root's) ordered entry list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EntryDecl {
    Context(ContextDecl),
    Endpoint(EndpointDecl),
    Host(HostDecl),
    RequestHandler(RequestHandlerDecl),
    Procedure(ProcedureDecl),
    Object(ObjectDecl),
    Reference(ReferenceDecl),
}

/// A nested context: owned (optionally named) or a reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDecl {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ref_id: Option<String>,
    #[serde(default = "default_true")]
    pub inherit: bool,
    #[serde(default)]
    pub entries: Vec<EntryDecl>,
    #[serde(default)]
    pub response_headers: Vec<HeaderDecl>,
    #[serde(default)]
    pub exceptions: Option<ExceptionsDecl>,
    #[serde(default)]
    pub position: FilePosition,
}

impl Default for ContextDecl {
    fn default() -> Self {
        Self {
            id: None,
            ref_id: None,
            inherit: true,
            entries: Vec::new(),
            response_headers: Vec::new(),
            exceptions: None,
            position: FilePosition::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDecl {
    pub path: String,
    #[serde(default = "default_true")]
    pub inherit: bool,
    #[serde(default)]
    pub entries: Vec<EntryDecl>,
    #[serde(default)]
    pub response_headers: Vec<HeaderDecl>,
    #[serde(default)]
    pub exceptions: Option<ExceptionsDecl>,
    #[serde(default)]
    pub position: FilePosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostDecl {
    pub server_name: String,
    #[serde(default = "default_true")]
    pub inherit: bool,
    #[serde(default)]
    pub entries: Vec<EntryDecl>,
    #[serde(default)]
    pub response_headers: Vec<HeaderDecl>,
    #[serde(default)]
    pub exceptions: Option<ExceptionsDecl>,
    #[serde(default)]
    pub position: FilePosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestHandlerDecl {
    pub implementation: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub position: FilePosition,
}

/// Expose an existing object under a new local id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDecl {
    pub id: String,
    pub ref_id: String,
    #[serde(default)]
    pub position: FilePosition,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
