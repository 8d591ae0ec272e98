// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Basic-protocol (message) transport contract.
//!
//! The basic protocol carries opaque messages with string metadata. The
//! `topic` metadata key selects which request handlers see a message; a
//! server advertises the union of its handlers' notifier sets at listen
//! time so the transport can pre-filter subscriptions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gantry_core::BoxError;

use crate::io::Input;

/// Metadata key carrying the message topic.
pub const TOPIC_KEY: &str = "topic";

/// One inbound message, as parsed by the transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicRequest {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl BasicRequest {
    pub fn with_topic(topic: impl Into<String>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(TOPIC_KEY.to_string(), topic.into());
        Self { values }
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn topic(&self) -> Option<&str> {
        self.value(TOPIC_KEY)
    }
}

/// The engine-side entry point a transport drives for every message.
pub trait BasicDispatcher: Send + Sync {
    fn dispatch(&self, request: BasicRequest) -> Input;
}

/// A bound basic-protocol listener. Same lifecycle contract as
/// [`HttpListener`](crate::http::HttpListener).
pub trait BasicListener: Send + Sync {
    fn listen(
        &self,
        notifiers: BTreeSet<String>,
        dispatcher: Arc<dyn BasicDispatcher>,
        on_release: Box<dyn FnOnce() + Send>,
    ) -> Result<(), BoxError>;

    fn release(&self);
}
