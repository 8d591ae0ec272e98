// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor option parsing.
//!
//! A main context is instantiated from flat key/value settings; this
//! module turns them into [`MainOptions`] plus the configuration-file path
//! the embedder must parse and install.

use std::path::PathBuf;

use thiserror::Error;

use gantry_engine::{MainOptions, StopSignal};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("multiple definition of attribute '{0}'")]
    Duplicate(String),

    #[error("invalid value \"{value}\" for attribute '{key}'")]
    Invalid { key: String, value: String },

    #[error("unknown parameter key=\"{key}\" with value=\"{value}\"")]
    Unknown { key: String, value: String },
}

/// Parsed supervisor settings.
#[derive(Debug, Clone, Default)]
pub struct MainSettings {
    /// Configuration file to parse and install; parsing is external.
    pub config_file: Option<PathBuf>,
    pub options: MainOptions,
}

/// Parse the recognised supervisor settings.
///
/// `stop-signal` may repeat; every other key must appear at most once.
pub fn parse_settings(pairs: &[(String, String)]) -> Result<MainSettings, SettingsError> {
    let mut settings = MainSettings::default();
    let mut seen_terminate_counter = false;
    let mut seen_catch = false;
    let mut seen_dump = false;
    let mut seen_return_code = false;
    let mut seen_verbose = false;

    for (key, value) in pairs {
        match key.as_str() {
            "config-file" => {
                if settings.config_file.is_some() {
                    return Err(SettingsError::Duplicate(key.clone()));
                }
                if value.is_empty() {
                    return Err(SettingsError::Invalid { key: key.clone(), value: value.clone() });
                }
                settings.config_file = Some(PathBuf::from(value));
            }
            "stop-signal" => {
                let signal = StopSignal::parse(value).ok_or_else(|| SettingsError::Invalid {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                settings.options.stop_signals.insert(signal);
            }
            "terminate-counter" => {
                if seen_terminate_counter {
                    return Err(SettingsError::Duplicate(key.clone()));
                }
                seen_terminate_counter = true;
                let counter: u32 = value.parse().map_err(|_| SettingsError::Invalid {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                settings.options.terminate_counter = Some(counter);
            }
            "catch-exception" => {
                if seen_catch {
                    return Err(SettingsError::Duplicate(key.clone()));
                }
                seen_catch = true;
                settings.options.catch_failure = parse_bool(key, value)?;
            }
            "dump-exception" => {
                if seen_dump {
                    return Err(SettingsError::Duplicate(key.clone()));
                }
                seen_dump = true;
                settings.options.dump_failure = parse_bool(key, value)?;
            }
            "exception-return-code" => {
                if seen_return_code {
                    return Err(SettingsError::Duplicate(key.clone()));
                }
                seen_return_code = true;
                let code: i32 = value.parse().map_err(|_| SettingsError::Invalid {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                settings.options.failure_return_code = Some(code);
            }
            "is-verbose" => {
                if seen_verbose {
                    return Err(SettingsError::Duplicate(key.clone()));
                }
                seen_verbose = true;
                settings.options.verbose = parse_bool(key, value)?;
            }
            _ => {
                return Err(SettingsError::Unknown { key: key.clone(), value: value.clone() });
            }
        }
    }

    Ok(settings)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SettingsError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(SettingsError::Invalid { key: key.to_string(), value: value.to_string() }),
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
