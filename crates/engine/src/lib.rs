// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gantry-engine: dispatch trees, server wrappers and the supervisor.
//!
//! The engine takes a built object/context graph and runs it: HTTP requests
//! travel host -> endpoint -> context -> request handler through
//! [`http::HttpContext`], basic-protocol messages through
//! [`basic::BasicContext`], and the [`supervisor::Main`] context owns every
//! long-running procedure, including the servers, until shutdown.

pub mod applications;
pub mod basic;
pub mod error;
pub mod failure;
pub mod http;
pub mod plugin;
pub mod supervisor;

pub use applications::{Application, ApplicationFactory, Applications};
pub use basic::{BasicRequestHandler, BasicServer};
pub use error::EngineError;
pub use failure::{Failure, FailureReport, HandlerError, SqlError, StatusError};
pub use http::{HttpRequestHandler, HttpServer};
pub use plugin::{PluginError, PluginNotFound, PluginSet, Plugins};
pub use supervisor::{
    block_signals, Certificate, Certificates, Main, MainOptions, ProcedureContext,
    ProcessRegistry, StopSignal,
};
