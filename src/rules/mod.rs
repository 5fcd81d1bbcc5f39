// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Compatibility rule set.
//!
//! Each rule is a pure function over the module inventory, the runtime
//! descriptor and the configuration. Rules never see each other's verdicts.
//! The order of [`DEFAULT_RULES`] is part of the contract: it decides which
//! reason is reported when several rules block, so it must stay stable.
//!
//! Adding a rule means writing one function in [`builtin`] and appending it
//! to the table.

pub mod builtin;

use std::fmt;

use serde::Serialize;

use crate::config::Configuration;
use crate::inventory::{ModuleRecord, RuntimeDescriptor};

/// Why activation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// The target library is already active in the process.
    AlreadyActivated,
    /// The runtime is past its supported end-of-life.
    EolRuntime,
    /// A component known to conflict with the target is active.
    IncompatibleModule { name: String },
    /// Activation is possible but risky; can be forced.
    RiskyButOverridable { detail: String },
    /// The target could not be located or the host state could not be assessed.
    TargetArtifactMissing,
}

impl AbortReason {
    /// Telemetry value for the `reason` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortReason::AlreadyActivated => "already_activated",
            AbortReason::EolRuntime => "eol_runtime",
            AbortReason::IncompatibleModule { .. } => "incompatible_module",
            AbortReason::RiskyButOverridable { .. } => "risky_but_overridable",
            AbortReason::TargetArtifactMissing => "target_artifact_missing",
        }
    }

    /// Reasons no configuration may override.
    pub fn is_never_overridable(&self) -> bool {
        matches!(self, AbortReason::AlreadyActivated | AbortReason::EolRuntime)
    }

    /// Extra `key:value` tag carrying the variant's payload, if any.
    pub fn detail_tag(&self) -> Option<String> {
        match self {
            AbortReason::IncompatibleModule { name } => Some(format!("module:{name}")),
            AbortReason::RiskyButOverridable { detail } => Some(format!("detail:{detail}")),
            _ => None,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::IncompatibleModule { name } => write!(f, "{} ({name})", self.as_str()),
            AbortReason::RiskyButOverridable { detail } => write!(f, "{} ({detail})", self.as_str()),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Outcome of a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block { reason: AbortReason, overridable: bool },
}

impl Verdict {
    /// A block that no configuration can lift.
    pub fn block(reason: AbortReason) -> Self {
        Verdict::Block {
            reason,
            overridable: false,
        }
    }

    /// A block that `force_override` lifts.
    ///
    /// Reasons that are never overridable stay hard blocks.
    pub fn overridable(reason: AbortReason) -> Self {
        let overridable = !reason.is_never_overridable();
        Verdict::Block { reason, overridable }
    }
}

/// Signature shared by every rule.
pub type RuleFn = fn(&[ModuleRecord], &RuntimeDescriptor, &Configuration) -> Verdict;

/// A named, stateless compatibility predicate.
#[derive(Clone, Copy)]
pub struct CompatibilityRule {
    pub id: &'static str,
    pub evaluate: RuleFn,
}

impl fmt::Debug for CompatibilityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatibilityRule").field("id", &self.id).finish()
    }
}

impl CompatibilityRule {
    pub const fn new(id: &'static str, evaluate: RuleFn) -> Self {
        Self { id, evaluate }
    }

    pub fn check(
        &self,
        modules: &[ModuleRecord],
        runtime: &RuntimeDescriptor,
        config: &Configuration,
    ) -> Verdict {
        (self.evaluate)(modules, runtime, config)
    }
}

/// The rule set, in evaluation order.
pub const DEFAULT_RULES: &[CompatibilityRule] = &[
    CompatibilityRule::new("eol_runtime", builtin::eol_runtime),
    CompatibilityRule::new("runtime_version_known", builtin::runtime_version_known),
    CompatibilityRule::new("target_already_active", builtin::target_already_active),
    CompatibilityRule::new("supported_sapi", builtin::supported_sapi),
    CompatibilityRule::new("incompatible_module", builtin::incompatible_module),
    CompatibilityRule::new("jit_enabled", builtin::jit_enabled),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(AbortReason::EolRuntime.as_str(), "eol_runtime");
        assert_eq!(AbortReason::AlreadyActivated.as_str(), "already_activated");
        assert_eq!(
            AbortReason::IncompatibleModule { name: "xdebug".into() }.as_str(),
            "incompatible_module"
        );
        assert_eq!(AbortReason::TargetArtifactMissing.as_str(), "target_artifact_missing");
        assert_eq!(
            AbortReason::RiskyButOverridable { detail: "jit".into() }.as_str(),
            "risky_but_overridable"
        );
    }

    #[test]
    fn test_reason_display_includes_detail() {
        let reason = AbortReason::IncompatibleModule { name: "xdebug".into() };
        assert_eq!(reason.to_string(), "incompatible_module (xdebug)");
        assert_eq!(AbortReason::EolRuntime.to_string(), "eol_runtime");
    }

    #[test]
    fn test_detail_tags() {
        let reason = AbortReason::RiskyButOverridable { detail: "jit".into() };
        assert_eq!(reason.detail_tag(), Some("detail:jit".to_string()));
        assert_eq!(AbortReason::EolRuntime.detail_tag(), None);
    }

    #[test]
    fn test_overridable_cannot_soften_hard_reasons() {
        assert_eq!(
            Verdict::overridable(AbortReason::EolRuntime),
            Verdict::Block {
                reason: AbortReason::EolRuntime,
                overridable: false
            }
        );
        assert_eq!(
            Verdict::overridable(AbortReason::AlreadyActivated),
            Verdict::block(AbortReason::AlreadyActivated)
        );
        assert!(matches!(
            Verdict::overridable(AbortReason::RiskyButOverridable { detail: "jit".into() }),
            Verdict::Block { overridable: true, .. }
        ));
    }

    #[test]
    fn test_rule_order() {
        let ids: Vec<_> = DEFAULT_RULES.iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                "eol_runtime",
                "runtime_version_known",
                "target_already_active",
                "supported_sapi",
                "incompatible_module",
                "jit_enabled",
            ]
        );
    }

    #[test]
    fn test_rule_ids_are_unique() {
        let mut ids: Vec<_> = DEFAULT_RULES.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), DEFAULT_RULES.len());
    }

    #[test]
    fn test_reason_serializes_tagged() {
        let json = serde_json::to_string(&AbortReason::IncompatibleModule {
            name: "xdebug".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"incompatible_module","name":"xdebug"}"#);
    }
}
