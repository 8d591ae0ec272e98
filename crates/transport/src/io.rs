// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request-body sink returned by the dispatch tree.

use gantry_core::BoxError;

/// Receives the request body from the transport.
pub trait Consumer: Send {
    /// Feed one chunk. Returning `false` tells the transport to stop
    /// sending further chunks.
    fn consume(&mut self, chunk: &[u8]) -> Result<bool, BoxError>;

    /// Called once after the final chunk has been fed.
    fn finish(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Result of dispatching a request.
///
/// An empty input means "not my request; try the next entry". A non-empty
/// input carries the [`Consumer`] the transport feeds with body bytes.
pub struct Input {
    consumer: Option<Box<dyn Consumer>>,
}

impl Input {
    pub fn empty() -> Self {
        Self { consumer: None }
    }

    pub fn with_consumer(consumer: impl Consumer + 'static) -> Self {
        Self { consumer: Some(Box::new(consumer)) }
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_none()
    }

    pub fn into_consumer(self) -> Option<Box<dyn Consumer>> {
        self.consumer
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
#[path = "io_tests.rs"]
mod tests;
