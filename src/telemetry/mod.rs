// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Out-of-band telemetry for injection decisions.
//!
//! - **Event model**: one [`TelemetryEvent`] per decision, serialized as a JSON line
//! - **Reporter**: non-blocking, at-most-once handoff; worker started on first use
//! - **Forwarder**: external process launched detached and fed on the caller's thread
//! - **Transports**: in-process sinks (debug log, in-memory)
//!
//! # Usage
//!
//! ```rust,ignore
//! use gatekeeper::telemetry::TelemetryReporter;
//!
//! let reporter = TelemetryReporter::from_configuration(&config);
//! reporter.report(&decision, &runtime);
//! // returns once the event is handed off; the host may exit right away
//! ```

mod event;
mod forwarder;
mod reporter;
mod stats;
mod transport;

pub use event::{
    EventMetadata, Point, TelemetryEvent, POINT_ABORT, POINT_ABORT_RUNTIME, POINT_COMPLETE,
};
pub use forwarder::{Forwarder, DEFAULT_FORWARDER_TIMEOUT, FORWARDER_PAYLOAD_KIND};
pub use reporter::{
    ReporterConfig, TelemetryReporter, DEFAULT_DELIVERY_BUDGET, DEFAULT_QUEUE_CAPACITY,
};
pub use stats::{ReporterStats, ReporterStatsSnapshot};
pub use transport::{LogTransport, MemoryTransport, Transport};
