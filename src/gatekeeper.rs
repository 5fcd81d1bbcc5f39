// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gatekeeper orchestrator.
//!
//! Sequences one activation attempt:
//!
//! ```text
//! Start → GuardChecked → InventoryCollected → Decided → Activating ─┐
//!   │                                                  └→ Skipping ─┴→ Reported → Done
//!   └─ (disabled or guard rejected) ───────────────────────────────────────────→ Done
//! ```
//!
//! Nothing escapes [`Gatekeeper::run`]. Errors and panics from the host
//! probe, the decision engine or the activator become
//! `AbortedSafe { TargetArtifactMissing }`. Module listing and runtime
//! facts are guarded separately, so a panic in one keeps what the other
//! found for the report. The host's panic hook is left alone.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::NaiveDate;
use tracing::{debug, error, info, trace, warn};

use crate::config::Configuration;
use crate::engine::{decide, InjectionDecision};
use crate::error::{ActivationError, GatekeeperError};
use crate::guard::IdempotencyGuard;
use crate::inventory::{self, HostProbe, ModuleInventory, RuntimeDescriptor, SupportPolicy};
use crate::rules::AbortReason;
use crate::telemetry::TelemetryReporter;

/// The primitive that actually turns the target library on.
#[cfg_attr(test, mockall::automock)]
pub trait Activator: Send + Sync {
    fn activate(&self) -> Result<(), ActivationError>;
}

/// Orchestrator states, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Start,
    GuardChecked,
    InventoryCollected,
    Decided,
    Activating,
    Skipping,
    Reported,
    Done,
}

/// What an activation attempt ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Injection not requested; nothing inspected, nothing reported.
    Disabled,
    /// Another gatekeeper already ran in this process; nothing reported.
    AlreadyRunning,
    /// A decision was made and reported.
    Completed {
        decision: InjectionDecision,
        activated: bool,
    },
}

impl GateOutcome {
    pub fn decision(&self) -> Option<&InjectionDecision> {
        match self {
            GateOutcome::Completed { decision, .. } => Some(decision),
            _ => None,
        }
    }

    pub fn activated(&self) -> bool {
        matches!(self, GateOutcome::Completed { activated: true, .. })
    }
}

/// Outcome plus the states visited on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRun {
    pub outcome: GateOutcome,
    pub states: Vec<GateState>,
}

impl GateRun {
    fn new() -> Self {
        Self {
            outcome: GateOutcome::Disabled,
            states: vec![GateState::Start],
        }
    }

    fn enter(&mut self, state: GateState) {
        trace!(?state, "gatekeeper state");
        self.states.push(state);
    }

    fn finish(mut self, outcome: GateOutcome) -> Self {
        self.enter(GateState::Done);
        self.outcome = outcome;
        self
    }
}

/// The gatekeeper for one process.
pub struct Gatekeeper {
    config: Configuration,
    probe: Box<dyn HostProbe>,
    activator: Box<dyn Activator>,
    reporter: TelemetryReporter,
    guard: IdempotencyGuard,
    policy: SupportPolicy,
    today: Option<NaiveDate>,
}

impl Gatekeeper {
    pub fn new(
        config: Configuration,
        probe: Box<dyn HostProbe>,
        activator: Box<dyn Activator>,
        reporter: TelemetryReporter,
    ) -> Self {
        Self {
            config,
            probe,
            activator,
            reporter,
            guard: IdempotencyGuard::process(),
            policy: SupportPolicy::default(),
            today: None,
        }
    }

    pub fn with_guard(mut self, guard: IdempotencyGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_support_policy(mut self, policy: SupportPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Evaluate end-of-life as of `today` instead of the wall clock.
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Give back the reporter, e.g. to wait for delivery in tools and tests.
    pub fn into_reporter(self) -> TelemetryReporter {
        self.reporter
    }

    /// Run one activation attempt.
    pub fn run(&self) -> GateRun {
        let mut run = GateRun::new();

        if !self.config.injection_enabled {
            debug!("Injection not enabled, gatekeeper idle");
            return run.finish(GateOutcome::Disabled);
        }

        if self.guard.check() {
            error!(
                "Gatekeeper invoked twice in one process; it is wired into the host more than once. \
                 Ignoring the second invocation"
            );
            return run.finish(GateOutcome::AlreadyRunning);
        }
        run.enter(GateState::GuardChecked);

        let (decision, runtime) = self.assess(&mut run);

        let (decision, activated) = if decision.is_proceeded() {
            run.enter(GateState::Activating);
            self.activate(decision)
        } else {
            run.enter(GateState::Skipping);
            if let Some(reason) = decision.abort_reason() {
                warn!(
                    reason = %reason,
                    force_override = self.config.force_override,
                    "Instrumentation not activated"
                );
            }
            (decision, false)
        };

        let report = catch_unwind(AssertUnwindSafe(|| self.reporter.report(&decision, &runtime)));
        if report.is_err() {
            debug!("Telemetry report panicked, ignored");
        }
        run.enter(GateState::Reported);

        run.finish(GateOutcome::Completed {
            decision,
            activated,
        })
    }

    fn assess(&self, run: &mut GateRun) -> (InjectionDecision, RuntimeDescriptor) {
        let today = self
            .today
            .unwrap_or_else(|| chrono::Utc::now().date_naive());
        let probe = self.probe.as_ref();

        let inventory = catch_unwind(AssertUnwindSafe(|| inventory::snapshot(probe)))
            .unwrap_or_else(|_| {
                warn!(error = %GatekeeperError::Panicked("module listing"), "Host inspection failed");
                ModuleInventory::unavailable()
            });
        let runtime = catch_unwind(AssertUnwindSafe(|| inventory::resolve(probe, &self.policy, today)))
            .unwrap_or_else(|_| {
                warn!(error = %GatekeeperError::Panicked("runtime facts"), "Host inspection failed");
                RuntimeDescriptor::unknown()
            });
        run.enter(GateState::InventoryCollected);

        let decision = catch_unwind(AssertUnwindSafe(|| decide(&inventory, &runtime, &self.config)))
            .unwrap_or_else(|_| {
                warn!(
                    error = %GatekeeperError::Panicked("decision engine"),
                    "Gatekeeper failed internally, instrumentation not activated"
                );
                InjectionDecision::aborted(AbortReason::TargetArtifactMissing)
            });
        run.enter(GateState::Decided);

        (decision, runtime)
    }

    fn activate(&self, decision: InjectionDecision) -> (InjectionDecision, bool) {
        let result = catch_unwind(AssertUnwindSafe(|| self.activator.activate()))
            .map_err(|_| GatekeeperError::Panicked("activator"))
            .and_then(|r| r.map_err(GatekeeperError::from));

        match result {
            Ok(()) => {
                info!(injection_forced = decision.is_forced(), "Instrumentation activated");
                if let InjectionDecision::Proceeded { overrides_applied } = &decision {
                    for reason in overrides_applied {
                        warn!(reason = %reason, "Activated despite overridable block (forced)");
                    }
                }
                (decision, true)
            }
            Err(err) => {
                warn!(error = %err, "Activation failed, instrumentation not activated");
                (
                    InjectionDecision::aborted(AbortReason::TargetArtifactMissing),
                    false,
                )
            }
        }
    }
}

/// Run the gatekeeper with configuration already resolved and the
/// process-wide guard. This is the entry point a host calls.
pub fn run_gatekeeper(
    config: Configuration,
    probe: Box<dyn HostProbe>,
    activator: Box<dyn Activator>,
) -> GateOutcome {
    let reporter = TelemetryReporter::from_configuration(&config);
    Gatekeeper::new(config, probe, activator, reporter)
        .run()
        .outcome
}
