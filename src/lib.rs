// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Injection Gatekeeper - decides whether automatic tracing may activate.
//!
//! Runs once inside a host process that had the tracing library injected
//! without its owner asking for it. It inspects the host, decides whether
//! activating instrumentation is safe, activates it or backs off, and reports
//! the outcome out-of-band. It never fails the host: every internal failure
//! becomes a safe abort.
//!
//! # Architecture
//!
//! - [`guard`] - Process-wide exactly-once gate
//! - [`inventory`] - Host module snapshot and runtime descriptor
//! - [`rules`] - Compatibility rules and abort reasons
//! - [`engine`] - Pure decision over inventory, runtime and configuration
//! - [`telemetry`] - Non-blocking, at-most-once outcome reporting
//! - [`gatekeeper`] - Orchestrator state machine tying the above together
//! - [`config`] - Stable configuration resolution (fleet, env, local, defaults)
//! - [`logging`] - Diagnostic log subscriber setup
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use gatekeeper::{load_configuration, run_gatekeeper};
//!
//! let outcome = run_gatekeeper(load_configuration(), Box::new(probe), Box::new(activator));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod gatekeeper;
pub mod guard;
pub mod inventory;
pub mod logging;
pub mod rules;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{load_configuration, Configuration, LogLevel};
pub use engine::{decide, InjectionDecision};
pub use error::{ActivationError, ConfigError, GatekeeperError, InventoryError, Result, TelemetryError};
pub use gatekeeper::{run_gatekeeper, Activator, GateOutcome, GateRun, GateState, Gatekeeper};
pub use guard::IdempotencyGuard;
pub use inventory::{
    HostProbe, ModuleInventory, ModuleKind, ModuleRecord, RuntimeDescriptor, RuntimeVersion,
    SupportPolicy, Version,
};
pub use rules::{AbortReason, CompatibilityRule, Verdict, DEFAULT_RULES};
pub use telemetry::{TelemetryEvent, TelemetryReporter};

/// Gatekeeper version, reported as the tracer version by default.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        let decision = decide(
            &ModuleInventory::collected(vec![]),
            &RuntimeDescriptor::new("php", Version::new(8, 3, 0)).with_sapi("cli"),
            &Configuration::enabled(),
        );
        assert_eq!(decision, InjectionDecision::proceeded());
        assert_eq!(DEFAULT_RULES[0].id, "eol_runtime");
    }
}
