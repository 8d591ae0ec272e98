// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request-time error taxonomy and classification.
//!
//! Handlers fail with a [`HandlerError`]; the dispatch tree propagates it
//! untouched to the server wrapper, which classifies it into a
//! [`FailureReport`] and renders that to a log line, to stderr or to an
//! HTTP response (see [`crate::http::failure`]). Classification is eager:
//! errors are plain values here, there is nothing to rethrow.

use std::fmt;

use thiserror::Error;
use tracing::error;

use gantry_core::{BoxError, FilePosition};

use crate::plugin::PluginNotFound;

/// Server token used in synthesized error pages.
pub(crate) const SERVER_TOKEN: &str = concat!("gantry/", env!("CARGO_PKG_VERSION"));

/// Short-circuit exception carrying an HTTP status code.
#[derive(Debug, Clone)]
pub struct StatusError {
    pub status: u16,
    pub content_type: String,
    pub message: Option<String>,
}

impl StatusError {
    pub fn new(status: u16) -> Self {
        Self { status, content_type: "text/html".to_string(), message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} {}", self.status, message),
            None => write!(f, "{} {}", self.status, status_message(self.status)),
        }
    }
}

impl std::error::Error for StatusError {}

/// Database failure with the diagnostics the driver reported.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SqlError {
    pub return_code: i32,
    pub message: String,
    pub diagnostics: Vec<String>,
}

/// Everything a request handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("http status {0}")]
    Status(#[from] StatusError),

    #[error("sql error: {0}")]
    Sql(#[from] SqlError),

    #[error(transparent)]
    Plugin(#[from] PluginNotFound),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("logic error: {0}")]
    Logic(String),

    /// Fallback for failures that carry no information, e.g. a panicking
    /// handler.
    #[error("unknown exception")]
    Unknown,

    #[error("{0}")]
    Other(#[from] BoxError),
}

/// A captured handler error plus the optional attachments the raiser
/// provided.
#[derive(Debug)]
pub struct Failure {
    pub error: HandlerError,
    pub position: Option<FilePosition>,
    pub stacktrace: Option<String>,
}

impl Failure {
    pub fn new(error: HandlerError) -> Self {
        Self { error, position: None, stacktrace: None }
    }

    pub fn with_position(mut self, position: FilePosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
        self.stacktrace = Some(stacktrace.into());
        self
    }

    pub fn report(&self) -> FailureReport {
        FailureReport::classify(self)
    }
}

impl From<HandlerError> for Failure {
    fn from(error: HandlerError) -> Self {
        Self::new(error)
    }
}

/// Classified failure, ready to render.
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// Kind name, e.g. `http status code 404`.
    pub exception: String,
    /// Human message of the failure.
    pub what: String,
    /// Extra diagnostic lines (SQL diagnostics, available plugins, ...).
    pub details: Option<String>,
    /// `file:line: message` when the error carried a position.
    pub file_message: Option<String>,
    pub stacktrace: Option<String>,
    /// HTTP projection.
    pub status: u16,
    pub content_type: String,
    pub title: String,
    pub message: String,
}

impl FailureReport {
    pub fn classify(failure: &Failure) -> Self {
        let mut report = match &failure.error {
            HandlerError::Status(e) => {
                let message = match &e.message {
                    Some(message) => message.clone(),
                    None => status_message(e.status).to_string(),
                };
                Self {
                    exception: format!("http status code {}", e.status),
                    what: message.clone(),
                    details: None,
                    file_message: None,
                    stacktrace: None,
                    status: e.status,
                    content_type: e.content_type.clone(),
                    title: format!("{} {}", e.status, status_message(e.status)),
                    message,
                }
            }
            HandlerError::Sql(e) => {
                let mut details = format!("SQL return code: {}", e.return_code);
                for line in &e.diagnostics {
                    details.push('\n');
                    details.push_str(line);
                }
                Self::internal("sql error", "SQL Error", e.message.clone())
                    .with_details(details)
            }
            HandlerError::Plugin(e) => {
                let mut details = "available implementations:".to_string();
                for name in &e.available {
                    details.push_str("\n- ");
                    details.push_str(name);
                }
                Self::internal("plugin not found", "Plugin Not Found", e.to_string())
                    .with_details(details)
            }
            HandlerError::Runtime(message) => {
                Self::internal("runtime error", "Runtime Error", message.clone())
            }
            HandlerError::InvalidArgument(message) => {
                Self::internal("invalid argument", "Invalid Argument", message.clone())
            }
            HandlerError::OutOfRange(message) => {
                Self::internal("out of range", "Out Of Range", message.clone())
            }
            HandlerError::Logic(message) => {
                Self::internal("logic error", "Logic Error", message.clone())
            }
            HandlerError::Unknown => Self::internal(
                "unknown exception",
                "Unknown Exception Error",
                "unknown exception".to_string(),
            ),
            HandlerError::Other(e) => Self::internal("exception", "Exception", e.to_string()),
        };

        report.file_message =
            failure.position.as_ref().map(|position| format!("{position}: {}", report.what));
        report.stacktrace = failure.stacktrace.clone();
        report
    }

    fn internal(exception: &str, title: &str, message: String) -> Self {
        Self {
            exception: exception.to_string(),
            what: message.clone(),
            details: None,
            file_message: None,
            stacktrace: None,
            status: 500,
            content_type: "text/html".to_string(),
            title: title.to_string(),
            message,
        }
    }

    fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    /// Multi-line diagnostic dump to stderr, used for fatal supervisor
    /// failures independent of the logging subsystem.
    pub fn dump_stderr(&self) {
        eprintln!("Exception : {}", self.exception);
        eprintln!("What      : {}", self.what);
        if let Some(details) = &self.details {
            eprintln!("Details   : {details}");
        }
        if let Some(file_message) = &self.file_message {
            eprintln!("File      : {file_message}");
        }
        match &self.stacktrace {
            Some(stacktrace) => eprintln!("Stacktrace: {stacktrace}"),
            None => eprintln!("Stacktrace: not available"),
        }
    }

    /// Same dump through the logging subsystem.
    pub fn log(&self) {
        error!(exception = %self.exception, what = %self.what, "request failed");
        if let Some(details) = &self.details {
            error!("details: {details}");
        }
        if let Some(file_message) = &self.file_message {
            error!("file: {file_message}");
        }
        if let Some(stacktrace) = &self.stacktrace {
            error!("stacktrace: {stacktrace}");
        }
    }

    /// Synthesized HTML error page.
    pub fn html(&self, show_exception: bool, show_stacktrace: bool) -> String {
        let mut page = String::from("<!DOCTYPE html>\n<html>\n<head>\n");
        page.push_str(&format!("<title>{}</title>\n", escape_html(&self.title)));
        page.push_str("</head>\n<body>\n");

        if show_exception {
            page.push_str("<center><h1>\n");
            page.push_str(&escape_html(&self.message));
            page.push_str("\n</h1></center>\n");
            if let Some(details) = &self.details {
                page.push_str("<hr>\n");
                page.push_str(&escape_html(details));
                page.push_str("<br>\n");
            }
        }

        if show_stacktrace {
            match &self.stacktrace {
                Some(stacktrace) => {
                    page.push_str("Stacktrace:\n<br>\n");
                    page.push_str(&escape_html(stacktrace));
                    page.push('\n');
                }
                None => page.push_str("Stacktrace: not available\n<br>\n"),
            }
        }

        page.push_str(&format!("<hr><center>{SERVER_TOKEN}</center>\n"));
        page.push_str("</body>\n</html>\n");
        page
    }

    /// Synthesized plain-text error body.
    pub fn text(&self, show_exception: bool, show_stacktrace: bool) -> String {
        let mut content = format!("{SERVER_TOKEN}: {}\n", self.title);
        content.push_str(&format!("Status code: {}\n", self.status));

        if show_exception {
            content.push_str(&format!("\n\nException: {}", self.message));
            if let Some(details) = &self.details {
                content.push_str(&format!("\n\nDetails:\n{details}\n"));
            }
        }

        if show_stacktrace {
            match &self.stacktrace {
                Some(stacktrace) => content.push_str(&format!("\n\nStacktrace:\n{stacktrace}")),
                None => content.push_str("\n\nStacktrace: not available\n"),
            }
        }

        content
    }
}

/// Reason phrase for an HTTP status code.
pub fn status_message(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown Error",
    }
}

/// Minimal HTML escaping for synthesized error pages.
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
