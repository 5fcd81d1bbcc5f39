// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Diagnostic logging initialization.
//!
//! The library only emits `tracing` events. Installing a subscriber is left
//! to whoever owns the process: the `gatekeeper` binary does it here, an
//! embedding host may already have one.

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogLevel;

/// Configuration for logging initialization.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level used when no filter directive is given.
    pub default_level: LogLevel,

    /// Whether to include file/line information.
    pub include_file_line: bool,

    /// Whether to include target module path.
    pub include_target: bool,

    /// Whether to use ANSI colors in output.
    pub ansi_colors: bool,

    /// Custom filter directive (overrides default_level).
    pub filter_directive: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Warn,
            include_file_line: false,
            include_target: true,
            ansi_colors: true,
            filter_directive: None,
        }
    }
}

impl LoggingConfig {
    /// Logging at the level the resolved configuration asks for.
    pub fn from_log_level(level: LogLevel) -> Self {
        Self {
            default_level: level,
            ..Self::default()
        }
    }

    /// Verbose output for working on the gatekeeper itself.
    pub fn development() -> Self {
        Self {
            default_level: LogLevel::Debug,
            include_file_line: true,
            include_target: true,
            ansi_colors: true,
            filter_directive: None,
        }
    }

    /// Filter directive in `RUST_LOG` syntax. Invalid directives fall back to the level.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_directive = Some(filter.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi_colors = ansi;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.default_level.as_directive());
        match &self.filter_directive {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| fallback()),
            None => fallback(),
        }
    }
}

/// Guard returned by [`init_logging`]. Keep it alive for the program's duration.
pub struct LoggingGuard {
    _private: (),
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for machine-readable output.
pub fn init_logging(config: &LoggingConfig) -> io::Result<LoggingGuard> {
    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .compact();

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    Ok(LoggingGuard { _private: () })
}
