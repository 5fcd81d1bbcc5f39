// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Decision engine.
//!
//! Folds the compatibility rule set into one [`InjectionDecision`]:
//!
//! 1. An incomplete inventory is a hard block (unknown state is never safe).
//! 2. Rules run in table order; the first non-overridable block ends evaluation.
//! 3. Overridable blocks are collected. None → proceed. Some without
//!    `force_override` → abort with the first one. Some with `force_override`
//!    → proceed, recording every override in rule order.

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::Configuration;
use crate::inventory::{ModuleInventory, RuntimeDescriptor};
use crate::rules::{AbortReason, CompatibilityRule, Verdict, DEFAULT_RULES};

/// The single outcome of an activation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InjectionDecision {
    Proceeded { overrides_applied: Vec<AbortReason> },
    AbortedSafe { reason: AbortReason },
}

impl InjectionDecision {
    pub fn proceeded() -> Self {
        InjectionDecision::Proceeded {
            overrides_applied: Vec::new(),
        }
    }

    pub fn aborted(reason: AbortReason) -> Self {
        InjectionDecision::AbortedSafe { reason }
    }

    pub fn is_proceeded(&self) -> bool {
        matches!(self, InjectionDecision::Proceeded { .. })
    }

    /// Proceeded only because overridable blocks were forced through.
    pub fn is_forced(&self) -> bool {
        matches!(self, InjectionDecision::Proceeded { overrides_applied } if !overrides_applied.is_empty())
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            InjectionDecision::AbortedSafe { reason } => Some(reason),
            InjectionDecision::Proceeded { .. } => None,
        }
    }
}

/// Decide using the default rule set.
pub fn decide(
    inventory: &ModuleInventory,
    runtime: &RuntimeDescriptor,
    config: &Configuration,
) -> InjectionDecision {
    decide_with(DEFAULT_RULES, inventory, runtime, config)
}

/// Decide using an explicit rule set.
pub fn decide_with(
    rules: &[CompatibilityRule],
    inventory: &ModuleInventory,
    runtime: &RuntimeDescriptor,
    config: &Configuration,
) -> InjectionDecision {
    if !inventory.is_complete() {
        debug!("Inventory incomplete, denying activation");
        return InjectionDecision::aborted(AbortReason::TargetArtifactMissing);
    }

    let modules = inventory.modules();
    let mut overridable = Vec::new();

    for rule in rules {
        match rule.check(modules, runtime, config) {
            Verdict::Allow => trace!(rule = rule.id, "allow"),
            Verdict::Block {
                reason,
                overridable: true,
            } if !reason.is_never_overridable() => {
                debug!(rule = rule.id, reason = %reason, "Overridable block");
                overridable.push(reason);
            }
            Verdict::Block { reason, .. } => {
                debug!(rule = rule.id, reason = %reason, "Hard block");
                return InjectionDecision::aborted(reason);
            }
        }
    }

    if overridable.is_empty() {
        return InjectionDecision::proceeded();
    }

    if config.force_override {
        InjectionDecision::Proceeded {
            overrides_applied: overridable,
        }
    } else {
        let first = overridable.swap_remove(0);
        InjectionDecision::aborted(first)
    }
}
