// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! [`Configuration`] is the single resolved value the decision core sees.
//! [`ConfigLayer`] is one partially-filled source (a policy file or the
//! process environment) before merging.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Verbosity of the gatekeeper's diagnostic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Matching `tracing` level, `None` when logging is off.
    pub fn to_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Trace => Some(tracing::Level::TRACE),
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Off => None,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" => Ok(LogLevel::Off),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// Resolved, immutable configuration for one activation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Whether injection was requested for this process at all.
    pub injection_enabled: bool,

    /// Downgrade overridable blocks to warnings and proceed anyway.
    pub force_override: bool,

    /// Diagnostic log verbosity.
    pub log_level: LogLevel,

    /// Version of the instrumentation library being guarded.
    pub tracer_version: String,

    /// Executable that receives telemetry events. `None` disables delivery.
    pub telemetry_forwarder_path: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            injection_enabled: false,
            force_override: false,
            log_level: LogLevel::default(),
            tracer_version: crate::VERSION.to_string(),
            telemetry_forwarder_path: None,
        }
    }
}

impl Configuration {
    /// Defaults with injection switched on.
    pub fn enabled() -> Self {
        Self {
            injection_enabled: true,
            ..Self::default()
        }
    }

    pub fn with_force_override(mut self, force: bool) -> Self {
        self.force_override = force;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_tracer_version(mut self, version: impl Into<String>) -> Self {
        self.tracer_version = version.into();
        self
    }

    pub fn with_forwarder(mut self, path: impl Into<PathBuf>) -> Self {
        self.telemetry_forwarder_path = Some(path.into());
        self
    }
}

/// One configuration source before merging. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub injection_enabled: Option<bool>,
    pub force_override: Option<bool>,
    pub log_level: Option<LogLevel>,
    /// Legacy debug switch; only consulted when no layer sets `log_level`.
    pub debug: Option<bool>,
    pub telemetry_forwarder_path: Option<PathBuf>,
}

impl ConfigLayer {
    pub fn is_empty(&self) -> bool {
        *self == ConfigLayer::default()
    }
}

/// On-disk shape of a local or fleet policy file.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PolicyFile {
    #[serde(default)]
    pub apm_configuration_default: std::collections::BTreeMap<String, serde_yaml::Value>,
}
