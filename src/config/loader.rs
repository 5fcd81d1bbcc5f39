// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from the environment and policy files.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ConfigError;

use super::types::{ConfigLayer, LogLevel, PolicyFile};

/// Injection switch. Empty or false-like (`0`, `false`, `no`, `off`) disables
/// injection; any other value, usually a product list, enables it.
pub const ENV_INJECTION_ENABLED: &str = "DD_INJECTION_ENABLED";

/// Force activation past overridable blocks.
pub const ENV_INJECT_FORCE: &str = "DD_INJECT_FORCE";

/// Explicit diagnostic log level.
pub const ENV_LOG_LEVEL: &str = "DD_TRACE_LOG_LEVEL";

/// Legacy debug switch.
pub const ENV_DEBUG: &str = "DD_TRACE_DEBUG";

/// Telemetry forwarder executable.
pub const ENV_FORWARDER_PATH: &str = "DD_TELEMETRY_FORWARDER_PATH";

/// Host-local policy file.
pub const LOCAL_POLICY_FILE: &str = "/etc/datadog-agent/application_monitoring.yaml";

/// Fleet-managed policy file.
pub const FLEET_POLICY_FILE: &str =
    "/etc/datadog-agent/managed/datadog-agent/stable/application_monitoring.yaml";

/// Locations of the two policy files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyPaths {
    pub local: PathBuf,
    pub fleet: PathBuf,
}

impl Default for PolicyPaths {
    fn default() -> Self {
        Self {
            local: PathBuf::from(LOCAL_POLICY_FILE),
            fleet: PathBuf::from(FLEET_POLICY_FILE),
        }
    }
}

/// Parse a boolean the way the tracer's environment options do.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_injection_enabled(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    // Usually a product list such as "tracer,profiler"
    parse_bool(value).unwrap_or(true)
}

/// Build a layer from `KEY = value` pairs. Invalid values are logged and skipped.
pub fn layer_from_pairs<I, K, V>(pairs: I, source: &str) -> ConfigLayer
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut layer = ConfigLayer::default();

    for (key, value) in pairs {
        let (key, value) = (key.as_ref(), value.as_ref());
        match key {
            ENV_INJECTION_ENABLED => layer.injection_enabled = Some(parse_injection_enabled(value)),
            ENV_INJECT_FORCE => match parse_bool(value) {
                Some(force) => layer.force_override = Some(force),
                None => warn_invalid(key, value, source),
            },
            ENV_LOG_LEVEL => match value.parse::<LogLevel>() {
                Ok(level) => layer.log_level = Some(level),
                Err(_) => warn_invalid(key, value, source),
            },
            ENV_DEBUG => match parse_bool(value) {
                Some(debug) => layer.debug = Some(debug),
                None => warn_invalid(key, value, source),
            },
            ENV_FORWARDER_PATH => {
                if !value.trim().is_empty() {
                    layer.telemetry_forwarder_path = Some(PathBuf::from(value.trim()));
                }
            }
            _ => {}
        }
    }

    layer
}

fn warn_invalid(key: &str, value: &str, source: &str) {
    let err = ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    warn!(source, "{err}, ignoring");
}

/// Read the recognized keys through an environment lookup.
///
/// Taking a closure keeps tests away from the real process environment.
pub fn layer_from_env<F>(lookup: F) -> ConfigLayer
where
    F: Fn(&str) -> Option<String>,
{
    let keys = [
        ENV_INJECTION_ENABLED,
        ENV_INJECT_FORCE,
        ENV_LOG_LEVEL,
        ENV_DEBUG,
        ENV_FORWARDER_PATH,
    ];
    let pairs = keys
        .iter()
        .filter_map(|key| lookup(key).map(|value| (*key, value)));
    layer_from_pairs(pairs, "environment")
}

/// Parse the contents of a policy file.
pub fn parse_policy(content: &str, source: &str) -> Result<ConfigLayer, ConfigError> {
    if content.trim().is_empty() {
        return Ok(ConfigLayer::default());
    }
    let file: PolicyFile = serde_yaml::from_str(content)?;

    let pairs = file
        .apm_configuration_default
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_yaml::Value::String(s) => Some((key, s)),
            serde_yaml::Value::Bool(b) => Some((key, b.to_string())),
            serde_yaml::Value::Number(n) => Some((key, n.to_string())),
            other => {
                warn!(source, key = %key, value = ?other, "Unsupported policy value type, ignoring");
                None
            }
        });

    Ok(layer_from_pairs(pairs, source))
}

/// Load a policy file. A missing file is `Ok(None)`.
pub fn load_policy_file(path: &Path) -> Result<Option<ConfigLayer>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let source = path.display().to_string();
    let layer = parse_policy(&content, &source)?;
    if layer.is_empty() {
        debug!(path = %source, "Policy file sets no recognized keys");
    }
    Ok(Some(layer))
}
