// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry event model.
//!
//! One [`TelemetryEvent`] is built per decision. Its JSON form is the line
//! handed to the forwarder:
//!
//! ```text
//! {"metadata":{"runtime_name":..,"runtime_version":..,"language_name":..,
//!   "language_version":..,"tracer_version":..,"pid":..},
//!  "points":[{"name":..,"tags":[..]}]}
//! ```

use serde::Serialize;

use crate::engine::InjectionDecision;
use crate::error::TelemetryError;
use crate::inventory::RuntimeDescriptor;
use crate::rules::AbortReason;

/// Activation went ahead.
pub const POINT_COMPLETE: &str = "library_entrypoint.complete";

/// Activation was refused.
pub const POINT_ABORT: &str = "library_entrypoint.abort";

/// Untagged companion of an end-of-life abort.
pub const POINT_ABORT_RUNTIME: &str = "library_entrypoint.abort.runtime";

/// Process and library facts attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    pub runtime_name: String,
    pub runtime_version: String,
    pub language_name: String,
    pub language_version: String,
    pub tracer_version: String,
    pub pid: u32,
}

impl EventMetadata {
    /// Metadata for the current process.
    ///
    /// The hosting runtime is the language runtime, so both pairs carry the
    /// same values.
    pub fn for_runtime(runtime: &RuntimeDescriptor, tracer_version: &str) -> Self {
        let version = runtime.version.to_string();
        Self {
            runtime_name: runtime.name.clone(),
            runtime_version: version.clone(),
            language_name: runtime.name.clone(),
            language_version: version,
            tracer_version: tracer_version.to_string(),
            pid: std::process::id(),
        }
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }
}

/// A named counter point with `key:value` tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Point {
    pub name: String,
    pub tags: Vec<String>,
}

impl Point {
    pub fn new(name: &str, tags: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            tags,
        }
    }
}

/// The lifecycle event for one activation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryEvent {
    pub metadata: EventMetadata,
    pub points: Vec<Point>,
}

impl TelemetryEvent {
    /// Build the event describing `decision`.
    pub fn from_decision(decision: &InjectionDecision, metadata: EventMetadata) -> Self {
        let points = match decision {
            InjectionDecision::Proceeded { overrides_applied } => vec![Point::new(
                POINT_COMPLETE,
                vec![format!("injection_forced:{}", !overrides_applied.is_empty())],
            )],
            InjectionDecision::AbortedSafe { reason } => {
                let mut tags = vec![format!("reason:{}", reason.as_str())];
                tags.extend(reason.detail_tag());

                let mut points = vec![Point::new(POINT_ABORT, tags)];
                if matches!(reason, AbortReason::EolRuntime) {
                    points.push(Point::new(POINT_ABORT_RUNTIME, Vec::new()));
                }
                points
            }
        };

        Self { metadata, points }
    }

    /// Serialize as one JSON line (trailing newline included).
    pub fn to_json_line(&self) -> Result<String, TelemetryError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
