// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Built-in compatibility rules.

use tracing::warn;

use crate::config::Configuration;
use crate::inventory::{ModuleKind, ModuleRecord, RuntimeDescriptor, RuntimeVersion, Version};

use super::{AbortReason, Verdict};

/// Server APIs the target library can run under.
pub const SUPPORTED_SAPIS: &[&str] = &[
    "apache2handler",
    "cgi-fcgi",
    "cli",
    "cli-server",
    "fpm-fcgi",
    "tea",
];

/// Debuggers and profilers that coexist with the target from this version on.
pub const COMPATIBLE_FROM: &[(&str, Version)] = &[("xdebug", Version::new(2, 9, 5))];

/// Runtimes past end-of-life are never instrumented.
pub fn eol_runtime(_: &[ModuleRecord], runtime: &RuntimeDescriptor, _: &Configuration) -> Verdict {
    if runtime.is_past_eol {
        Verdict::block(AbortReason::EolRuntime)
    } else {
        Verdict::Allow
    }
}

/// A runtime whose version could not be resolved cannot be assessed.
pub fn runtime_version_known(
    _: &[ModuleRecord],
    runtime: &RuntimeDescriptor,
    _: &Configuration,
) -> Verdict {
    match runtime.version {
        RuntimeVersion::Known(_) => Verdict::Allow,
        RuntimeVersion::Unknown => {
            warn!(runtime = %runtime.name, "Runtime version unknown, cannot assess compatibility");
            Verdict::block(AbortReason::TargetArtifactMissing)
        }
    }
}

/// The target library must not be activated twice.
pub fn target_already_active(
    modules: &[ModuleRecord],
    _: &RuntimeDescriptor,
    _: &Configuration,
) -> Verdict {
    if modules.iter().any(|m| m.kind == ModuleKind::Target) {
        Verdict::block(AbortReason::AlreadyActivated)
    } else {
        Verdict::Allow
    }
}

/// Only a known set of server APIs is supported. An unreported one is not.
pub fn supported_sapi(_: &[ModuleRecord], runtime: &RuntimeDescriptor, _: &Configuration) -> Verdict {
    match runtime.sapi.as_deref() {
        Some(sapi) if SUPPORTED_SAPIS.contains(&sapi) => Verdict::Allow,
        Some(sapi) => Verdict::block(AbortReason::IncompatibleModule {
            name: sapi.to_string(),
        }),
        None => {
            warn!(runtime = %runtime.name, "Server API not reported, cannot assess compatibility");
            Verdict::block(AbortReason::TargetArtifactMissing)
        }
    }
}

/// Debuggers and profilers hook the same runtime internals as the target.
pub fn incompatible_module(
    modules: &[ModuleRecord],
    _: &RuntimeDescriptor,
    _: &Configuration,
) -> Verdict {
    let conflicting = modules
        .iter()
        .filter(|m| matches!(m.kind, ModuleKind::Debugger | ModuleKind::Profiler))
        .find(|m| !is_compatible_release(m));

    match conflicting {
        Some(module) => Verdict::block(AbortReason::IncompatibleModule {
            name: module.name.clone(),
        }),
        None => Verdict::Allow,
    }
}

/// Whether `module` is a release listed in [`COMPATIBLE_FROM`].
/// A module without a parseable version never is.
fn is_compatible_release(module: &ModuleRecord) -> bool {
    let Some(version) = module.version.as_deref().and_then(Version::parse) else {
        return false;
    };
    COMPATIBLE_FROM
        .iter()
        .any(|(name, from)| module.name.eq_ignore_ascii_case(name) && version >= *from)
}

/// An active JIT compiler can miscompile instrumented code paths.
pub fn jit_enabled(_: &[ModuleRecord], runtime: &RuntimeDescriptor, _: &Configuration) -> Verdict {
    if runtime.jit_enabled {
        Verdict::overridable(AbortReason::RiskyButOverridable {
            detail: "jit".to_string(),
        })
    } else {
        Verdict::Allow
    }
}
