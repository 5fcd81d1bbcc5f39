// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configuration layers with the stable-config precedence.

use super::types::{ConfigLayer, Configuration, LogLevel};

/// Merge layers into one resolved configuration.
///
/// Precedence (highest to lowest):
/// 1. Fleet policy file
/// 2. Process environment
/// 3. Local policy file
/// 4. Default values
pub fn merge_layers(
    local: Option<ConfigLayer>,
    env: ConfigLayer,
    fleet: Option<ConfigLayer>,
) -> Configuration {
    let layers: Vec<ConfigLayer> = [fleet, Some(env), local].into_iter().flatten().collect();
    let mut result = Configuration::default();

    if let Some(enabled) = layers.iter().find_map(|l| l.injection_enabled) {
        result.injection_enabled = enabled;
    }

    if let Some(force) = layers.iter().find_map(|l| l.force_override) {
        result.force_override = force;
    }

    // An explicit level anywhere beats the legacy debug switch
    result.log_level = match layers.iter().find_map(|l| l.log_level) {
        Some(level) => level,
        None if layers.iter().find_map(|l| l.debug) == Some(true) => LogLevel::Debug,
        None => result.log_level,
    };

    if let Some(path) = layers.iter().find_map(|l| l.telemetry_forwarder_path.clone()) {
        result.telemetry_forwarder_path = Some(path);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_merge_defaults_only() {
        let config = merge_layers(None, ConfigLayer::default(), None);
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_env_overrides_local() {
        let local = ConfigLayer {
            force_override: Some(true),
            injection_enabled: Some(true),
            ..Default::default()
        };
        let env = ConfigLayer {
            force_override: Some(false),
            ..Default::default()
        };

        let config = merge_layers(Some(local), env, None);
        assert!(!config.force_override); // env wins
        assert!(config.injection_enabled); // falls through to local
    }

    #[test]
    fn test_fleet_overrides_env() {
        let env = ConfigLayer {
            injection_enabled: Some(true),
            force_override: Some(true),
            ..Default::default()
        };
        let fleet = ConfigLayer {
            force_override: Some(false),
            ..Default::default()
        };

        let config = merge_layers(None, env, Some(fleet));
        assert!(config.injection_enabled);
        assert!(!config.force_override);
    }

    #[test]
    fn test_debug_switch_sets_level() {
        let env = ConfigLayer {
            debug: Some(true),
            ..Default::default()
        };
        assert_eq!(merge_layers(None, env, None).log_level, LogLevel::Debug);
    }

    #[test]
    fn test_explicit_level_beats_debug_switch() {
        let local = ConfigLayer {
            log_level: Some(LogLevel::Error),
            ..Default::default()
        };
        let env = ConfigLayer {
            debug: Some(true),
            ..Default::default()
        };
        assert_eq!(merge_layers(Some(local), env, None).log_level, LogLevel::Error);
    }

    #[test]
    fn test_forwarder_path_precedence() {
        let local = ConfigLayer {
            telemetry_forwarder_path: Some(PathBuf::from("/local")),
            ..Default::default()
        };
        let fleet = ConfigLayer {
            telemetry_forwarder_path: Some(PathBuf::from("/fleet")),
            ..Default::default()
        };
        let config = merge_layers(Some(local), ConfigLayer::default(), Some(fleet));
        assert_eq!(config.telemetry_forwarder_path, Some(PathBuf::from("/fleet")));
    }
}
