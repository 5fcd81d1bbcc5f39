// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration resolution for the gatekeeper.
//!
//! Produces one immutable [`Configuration`] before the decision core runs.
//! Sources, highest precedence first:
//! - Fleet policy file: /etc/datadog-agent/managed/datadog-agent/stable/application_monitoring.yaml
//! - Process environment: DD_INJECTION_ENABLED, DD_INJECT_FORCE, DD_TRACE_LOG_LEVEL, ...
//! - Local policy file: /etc/datadog-agent/application_monitoring.yaml
//! - Defaults
//!
//! Resolution never fails. A broken policy file is logged and its layer skipped.

mod loader;
mod merger;
mod types;

pub use loader::{
    layer_from_env, layer_from_pairs, load_policy_file, parse_bool, parse_policy, PolicyPaths,
    ENV_DEBUG, ENV_FORWARDER_PATH, ENV_INJECTION_ENABLED, ENV_INJECT_FORCE, ENV_LOG_LEVEL,
    FLEET_POLICY_FILE, LOCAL_POLICY_FILE,
};
pub use merger::merge_layers;
pub use types::{ConfigLayer, Configuration, LogLevel};

use std::path::Path;

use tracing::warn;

/// Resolve configuration from the real process environment and default policy paths.
pub fn load_configuration() -> Configuration {
    load_configuration_from(&PolicyPaths::default(), |key| std::env::var(key).ok())
}

/// Resolve configuration from explicit policy paths and an environment lookup.
pub fn load_configuration_from<F>(paths: &PolicyPaths, lookup: F) -> Configuration
where
    F: Fn(&str) -> Option<String>,
{
    let local = load_layer(&paths.local);
    let env = layer_from_env(lookup);
    let fleet = load_layer(&paths.fleet);

    merge_layers(local, env, fleet)
}

fn load_layer(path: &Path) -> Option<ConfigLayer> {
    match load_policy_file(path) {
        Ok(layer) => layer,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Ignoring unreadable policy file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths_in(temp: &TempDir) -> PolicyPaths {
        PolicyPaths {
            local: temp.path().join("local.yaml"),
            fleet: temp.path().join("fleet.yaml"),
        }
    }

    #[test]
    fn test_load_with_no_files() {
        let temp = TempDir::new().unwrap();
        let config = load_configuration_from(&paths_in(&temp), |_| None);
        assert_eq!(config, Configuration::default());
    }

    #[test]
    fn test_fleet_file_beats_environment() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(&temp);
        std::fs::write(
            &paths.fleet,
            "apm_configuration_default:\n  DD_INJECT_FORCE: false\n",
        )
        .unwrap();

        let config = load_configuration_from(&paths, |key| match key {
            ENV_INJECT_FORCE => Some("true".to_string()),
            ENV_INJECTION_ENABLED => Some("tracer".to_string()),
            _ => None,
        });

        assert!(config.injection_enabled);
        assert!(!config.force_override);
    }

    #[test]
    fn test_malformed_local_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(&temp);
        std::fs::write(&paths.local, "apm_configuration_default: [").unwrap();

        let config = load_configuration_from(&paths, |key| {
            (key == ENV_INJECTION_ENABLED).then(|| "1".to_string())
        });
        assert!(config.injection_enabled);
        assert!(!config.force_override);
    }
}
