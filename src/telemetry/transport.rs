// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process telemetry transports.
//!
//! A transport runs on the reporter's worker, never on the host's thread.
//! Errors are returned to the worker, which logs and drops them. Delivery
//! through an external process goes through [`super::Forwarder`] instead.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::TelemetryError;

use super::event::TelemetryEvent;

/// Sink for telemetry events.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Deliver one event. Called at most once per event.
    async fn deliver(&self, event: TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Used when no forwarder is configured: the event only reaches the debug log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        let line = event.to_json_line()?;
        debug!(event = %line.trim_end(), "No telemetry forwarder configured, event not sent");
        Ok(())
    }
}

/// Keeps delivered events in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything delivered so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn deliver(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InjectionDecision;
    use crate::inventory::{RuntimeDescriptor, Version};
    use crate::telemetry::event::EventMetadata;

    fn event() -> TelemetryEvent {
        let runtime = RuntimeDescriptor::new("php", Version::new(8, 2, 0));
        TelemetryEvent::from_decision(
            &InjectionDecision::proceeded(),
            EventMetadata::for_runtime(&runtime, "1.0.0"),
        )
    }

    #[tokio::test]
    async fn test_memory_transport_collects() {
        let transport = MemoryTransport::new();
        transport.deliver(event()).await.unwrap();
        transport.deliver(event()).await.unwrap();
        assert_eq!(transport.events().len(), 2);
    }

    #[tokio::test]
    async fn test_log_transport_accepts() {
        assert!(LogTransport.deliver(event()).await.is_ok());
    }
}
