// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use gantry_engine::StopSignal;

use super::*;

fn pairs(input: &[(&str, &str)]) -> Vec<(String, String)> {
    input.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn defaults_apply_when_no_settings_are_given() {
    let settings = parse_settings(&[]).unwrap();
    assert!(settings.config_file.is_none());
    assert!(settings.options.stop_signals.is_empty());
    assert_eq!(settings.options.terminate_counter, None);
    assert!(!settings.options.catch_failure);
    assert!(settings.options.dump_failure);
    assert_eq!(settings.options.failure_return_code, None);
    assert!(!settings.options.verbose);
}

#[test]
fn full_settings_parse() {
    let settings = parse_settings(&pairs(&[
        ("config-file", "/etc/gantry/main.xml"),
        ("stop-signal", "interrupt"),
        ("stop-signal", "terminate"),
        ("terminate-counter", "2"),
        ("catch-exception", "true"),
        ("dump-exception", "false"),
        ("exception-return-code", "-1"),
        ("is-verbose", "true"),
    ]))
    .unwrap();

    assert_eq!(settings.config_file.as_deref(), Some(std::path::Path::new("/etc/gantry/main.xml")));
    assert!(settings.options.stop_signals.contains(&StopSignal::Interrupt));
    assert!(settings.options.stop_signals.contains(&StopSignal::Terminate));
    assert_eq!(settings.options.terminate_counter, Some(2));
    assert!(settings.options.catch_failure);
    assert!(!settings.options.dump_failure);
    assert_eq!(settings.options.failure_return_code, Some(-1));
    assert!(settings.options.verbose);
}

#[test]
fn repeated_stop_signals_accumulate() {
    let settings = parse_settings(&pairs(&[
        ("stop-signal", "pipe"),
        ("stop-signal", "pipe"),
        ("stop-signal", "interrupt"),
    ]))
    .unwrap();
    assert_eq!(settings.options.stop_signals.len(), 2);
}

#[parameterized(
    config_file = { "config-file", "/a.xml" },
    terminate_counter = { "terminate-counter", "1" },
    catch_exception = { "catch-exception", "true" },
    dump_exception = { "dump-exception", "true" },
    return_code = { "exception-return-code", "1" },
    verbose = { "is-verbose", "true" },
)]
fn non_repeatable_keys_reject_duplicates(key: &str, value: &str) {
    let err = parse_settings(&pairs(&[(key, value), (key, value)])).unwrap_err();
    assert!(matches!(err, SettingsError::Duplicate(k) if k == key));
}

#[parameterized(
    bad_signal = { "stop-signal", "sigquit" },
    bad_counter = { "terminate-counter", "-1" },
    bad_bool = { "catch-exception", "yes" },
    bad_code = { "exception-return-code", "abc" },
    empty_config = { "config-file", "" },
)]
fn invalid_values_are_rejected(key: &str, value: &str) {
    let err = parse_settings(&pairs(&[(key, value)])).unwrap_err();
    assert!(matches!(err, SettingsError::Invalid { key: k, .. } if k == key));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = parse_settings(&pairs(&[("color", "blue")])).unwrap_err();
    assert!(matches!(err, SettingsError::Unknown { key, .. } if key == "color"));
}
