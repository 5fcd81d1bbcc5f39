// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the injection gatekeeper.
//!
//! Every concern gets its own `thiserror` enum. None of these ever cross the
//! public entry point: the orchestrator converts them into a safe abort
//! decision, and the telemetry worker swallows transport failures.

use thiserror::Error;

/// Errors raised while inspecting the host process.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Host inspection unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed host snapshot: {0}")]
    Malformed(String),

    #[error("IO error reading host snapshot: {0}")]
    Io(String),
}

impl From<std::io::Error> for InventoryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Errors raised by the target-activation primitive.
#[derive(Error, Debug)]
pub enum ActivationError {
    #[error("Target artifact missing: {0}")]
    ArtifactMissing(String),

    #[error("Target failed to load: {0}")]
    LoadFailed(String),
}

/// Errors raised while delivering a telemetry event.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to spawn forwarder: {0}")]
    Spawn(String),

    #[error("IO error talking to forwarder: {0}")]
    Io(String),

    #[error("Delivery timed out after {0}ms")]
    Timeout(u64),

    #[error("Failed to serialize event: {0}")]
    Serialize(String),

    #[error("Forwarder exited with status {0:?}")]
    ExitStatus(Option<i32>),
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

/// Errors that can occur during configuration resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("IO error reading policy file: {0}")]
    Io(String),

    #[error("YAML parsing error: {0}")]
    Yaml(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

/// Internal failure of the gatekeeper itself.
///
/// Caught at the orchestrator boundary and turned into a safe abort.
#[derive(Error, Debug)]
pub enum GatekeeperError {
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Activation error: {0}")]
    Activation(#[from] ActivationError),

    #[error("Panic in {0}")]
    Panicked(&'static str),
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: InventoryError = io_err.into();
        assert!(matches!(err, InventoryError::Io(_)));
    }

    #[test]
    fn test_inventory_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{nope");
        let err: InventoryError = result.unwrap_err().into();
        assert!(matches!(err, InventoryError::Malformed(_)));
    }

    #[test]
    fn test_config_error_from_yaml() {
        let result: std::result::Result<serde_yaml::Value, _> = serde_yaml::from_str("a: [1, 2");
        let err: ConfigError = result.unwrap_err().into();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_gatekeeper_error_from_activation() {
        let err: GatekeeperError = ActivationError::LoadFailed("dlopen".to_string()).into();
        assert!(matches!(err, GatekeeperError::Activation(_)));
        assert!(err.to_string().contains("dlopen"));
    }

    #[test]
    fn test_error_display() {
        let err = TelemetryError::Timeout(2000);
        assert_eq!(err.to_string(), "Delivery timed out after 2000ms");

        let err = ConfigError::InvalidValue {
            key: "DD_INJECT_FORCE".to_string(),
            value: "maybe".to_string(),
        };
        assert!(err.to_string().contains("DD_INJECT_FORCE"));
        assert!(err.to_string().contains("maybe"));
    }
}
