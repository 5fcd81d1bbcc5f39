// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry reporter.
//!
//! The host-facing half builds the event and hands it off without waiting.
//! With a forwarder configured, the forwarder process is launched and fed on
//! the calling thread, so the event survives a host that exits right after
//! `report`. In-process transports go through a bounded channel (`try_send`,
//! drop on overflow) to a worker thread running a single-threaded tokio
//! runtime. The same worker reaps launched forwarders. It is started on first
//! use, so a run that never reports never starts a thread.

use std::process::Child;
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::engine::InjectionDecision;
use crate::inventory::RuntimeDescriptor;

use super::event::{EventMetadata, TelemetryEvent};
use super::forwarder::{reap, Forwarder};
use super::stats::{ReporterStats, ReporterStatsSnapshot};
use super::transport::{LogTransport, Transport};

/// Jobs that may wait for the worker. One attempt produces one event.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Upper bound on one in-process delivery, enforced by the worker.
pub const DEFAULT_DELIVERY_BUDGET: Duration = Duration::from_secs(3);

const WORKER_THREAD_NAME: &str = "gatekeeper-telemetry";

/// Reporter settings.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub queue_capacity: usize,
    pub delivery_budget: Duration,
    pub tracer_version: String,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            delivery_budget: DEFAULT_DELIVERY_BUDGET,
            tracer_version: crate::VERSION.to_string(),
        }
    }
}

impl ReporterConfig {
    pub fn with_tracer_version(mut self, version: impl Into<String>) -> Self {
        self.tracer_version = version.into();
        self
    }

    pub fn with_delivery_budget(mut self, budget: Duration) -> Self {
        self.delivery_budget = budget;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

enum Sink {
    InProcess(Arc<dyn Transport>),
    Forwarder(Forwarder),
}

enum Job {
    Deliver {
        event: TelemetryEvent,
        transport: Arc<dyn Transport>,
        budget: Duration,
    },
    Reap {
        child: Child,
        budget: Duration,
    },
}

struct Worker {
    sender: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// If the thread cannot be started, every job is refused.
    fn start(capacity: usize, stats: Arc<ReporterStats>) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let spawned = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(rx, stats));

        match spawned {
            Ok(handle) => Self {
                sender: Some(tx),
                thread: Some(handle),
            },
            Err(err) => {
                warn!(error = %err, "Could not start telemetry worker");
                Self {
                    sender: None,
                    thread: None,
                }
            }
        }
    }
}

/// Best-effort, at-most-once reporter of injection decisions.
pub struct TelemetryReporter {
    sink: Sink,
    worker: OnceLock<Worker>,
    stats: Arc<ReporterStats>,
    config: ReporterConfig,
}

impl TelemetryReporter {
    /// Reporter delivering through an in-process `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: ReporterConfig) -> Self {
        Self::with_sink(Sink::InProcess(transport), config)
    }

    /// Reporter handing each event to an external forwarder process.
    pub fn forwarding(forwarder: Forwarder, config: ReporterConfig) -> Self {
        Self::with_sink(Sink::Forwarder(forwarder), config)
    }

    fn with_sink(sink: Sink, config: ReporterConfig) -> Self {
        Self {
            sink,
            worker: OnceLock::new(),
            stats: Arc::new(ReporterStats::new()),
            config,
        }
    }

    /// Reporter for a resolved configuration: the forwarder if one is set,
    /// otherwise the debug log.
    pub fn from_configuration(config: &Configuration) -> Self {
        let reporter_config =
            ReporterConfig::default().with_tracer_version(config.tracer_version.clone());
        match &config.telemetry_forwarder_path {
            Some(path) => Self::forwarding(Forwarder::new(path), reporter_config),
            None => Self::new(Arc::new(LogTransport), reporter_config),
        }
    }

    /// Report one decision. Never blocks on delivery, never fails.
    pub fn report(&self, decision: &InjectionDecision, runtime: &RuntimeDescriptor) {
        let metadata = EventMetadata::for_runtime(runtime, &self.config.tracer_version);
        self.submit(TelemetryEvent::from_decision(decision, metadata));
    }

    /// Hand a prebuilt event to the sink.
    pub fn submit(&self, event: TelemetryEvent) {
        match &self.sink {
            Sink::InProcess(transport) => {
                let job = Job::Deliver {
                    event,
                    transport: Arc::clone(transport),
                    budget: self.config.delivery_budget,
                };
                if self.enqueue(job) {
                    self.stats.record_queued();
                } else {
                    self.stats.record_dropped();
                }
            }
            Sink::Forwarder(forwarder) => match forwarder.launch(&event) {
                Ok(child) => {
                    self.stats.record_queued();
                    let job = Job::Reap {
                        child,
                        budget: forwarder.timeout(),
                    };
                    if !self.enqueue(job) {
                        debug!("Forwarder left running unreaped");
                    }
                }
                Err(err) => {
                    self.stats.record_failed();
                    warn!(error = %err, "Could not launch telemetry forwarder");
                }
            },
        }
    }

    fn enqueue(&self, job: Job) -> bool {
        let worker = self.worker.get_or_init(|| {
            Worker::start(self.config.queue_capacity, Arc::clone(&self.stats))
        });
        let Some(sender) = &worker.sender else {
            return false;
        };

        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Telemetry queue full, job dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Telemetry worker gone, job dropped");
                false
            }
        }
    }

    pub fn stats(&self) -> ReporterStatsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn is_started(&self) -> bool {
        self.worker.get().is_some()
    }

    /// Close the channel and wait for the worker to drain it.
    ///
    /// The host path never calls this; dropping the reporter detaches the
    /// worker instead.
    pub fn shutdown(mut self) -> ReporterStatsSnapshot {
        if let Some(mut worker) = self.worker.take() {
            worker.sender.take();
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    debug!("Telemetry worker panicked");
                }
            }
        }
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for TelemetryReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = match &self.sink {
            Sink::InProcess(transport) => transport.name(),
            Sink::Forwarder(_) => "forwarder",
        };
        f.debug_struct("TelemetryReporter")
            .field("sink", &sink)
            .field("started", &self.is_started())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

fn run_worker(mut rx: mpsc::Receiver<Job>, stats: Arc<ReporterStats>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            debug!(error = %err, "Telemetry worker could not build runtime");
            return;
        }
    };

    runtime.block_on(async move {
        while let Some(job) = rx.recv().await {
            match job {
                Job::Deliver {
                    event,
                    transport,
                    budget,
                } => match timeout(budget, transport.deliver(event)).await {
                    Ok(Ok(())) => stats.record_delivered(),
                    Ok(Err(err)) => {
                        stats.record_failed();
                        warn!(transport = transport.name(), error = %err, "Telemetry delivery failed");
                    }
                    Err(_) => {
                        stats.record_failed();
                        warn!(
                            transport = transport.name(),
                            budget_ms = budget.as_millis() as u64,
                            "Telemetry delivery timed out"
                        );
                    }
                },
                Job::Reap { child, budget } => match reap(child, budget).await {
                    Ok(()) => stats.record_delivered(),
                    Err(err) => {
                        stats.record_failed();
                        warn!(transport = "forwarder", error = %err, "Telemetry delivery failed");
                    }
                },
            }
        }
    });
}
