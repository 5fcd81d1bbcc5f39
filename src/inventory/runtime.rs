// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Runtime descriptor resolution.
//!
//! Resolves the hosting runtime's name, version and end-of-life status once
//! per process. Missing or unparseable versions become
//! [`RuntimeVersion::Unknown`], which the rule set refuses to activate on.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::HostProbe;

/// Name used when the host cannot tell us what it is.
pub const UNKNOWN_RUNTIME: &str = "unknown";

/// `major.minor.patch` version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Lenient parse: accepts `8`, `8.2`, `8.2.10` and ignores build and
    /// pre-release suffixes such as `8.2.10-dev`, `7.4.33+deb12` or `8.3.0RC1`.
    pub fn parse(input: &str) -> Option<Self> {
        let core = input
            .trim()
            .split(|c: char| c == '-' || c == '+' || c == ' ')
            .next()?;
        if core.is_empty() {
            return None;
        }

        let mut parts = core.split('.');
        let major = leading_number(parts.next()?)?;
        let minor = match parts.next() {
            Some(p) => leading_number(p)?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => leading_number(p)?,
            None => 0,
        };

        Some(Self::new(major, minor, patch))
    }
}

/// `0RC1` -> 0, `4alpha` -> 4, `x` -> None.
fn leading_number(component: &str) -> Option<u32> {
    let end = component
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(component.len());
    component[..end].parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Runtime version, or the sentinel for "could not be determined".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeVersion {
    Known(Version),
    Unknown,
}

impl RuntimeVersion {
    pub fn known(&self) -> Option<Version> {
        match self {
            RuntimeVersion::Known(v) => Some(*v),
            RuntimeVersion::Unknown => None,
        }
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeVersion::Known(v) => v.fmt(f),
            RuntimeVersion::Unknown => f.write_str(UNKNOWN_RUNTIME),
        }
    }
}

/// Raw facts reported by the host, before interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeFacts {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Whether the runtime's just-in-time compiler is switched on.
    #[serde(default)]
    pub jit_enabled: bool,
    /// Server API the runtime was started under (`cli`, `fpm-fcgi`, ...).
    #[serde(default)]
    pub sapi: Option<String>,
}

/// End-of-support date for one `major.minor` release line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfLife {
    pub major: u32,
    pub minor: u32,
    pub date: NaiveDate,
}

/// Which runtime versions the target library still supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportPolicy {
    /// Anything older is past end-of-life regardless of date.
    pub minimum: Version,
    pub end_of_life: Vec<EndOfLife>,
}

impl Default for SupportPolicy {
    fn default() -> Self {
        Self {
            minimum: Version::new(7, 0, 0),
            end_of_life: Vec::new(),
        }
    }
}

impl SupportPolicy {
    pub fn with_minimum(mut self, minimum: Version) -> Self {
        self.minimum = minimum;
        self
    }

    pub fn with_end_of_life(mut self, major: u32, minor: u32, date: NaiveDate) -> Self {
        self.end_of_life.push(EndOfLife { major, minor, date });
        self
    }

    /// Whether `version` is past end-of-life on `today`.
    ///
    /// An unknown version is not reported as EOL here; the rule set
    /// default-denies it so telemetry does not claim an EOL it never saw.
    pub fn is_past_eol(&self, version: &RuntimeVersion, today: NaiveDate) -> bool {
        let Some(version) = version.known() else {
            return false;
        };
        if version < self.minimum {
            return true;
        }
        self.end_of_life
            .iter()
            .any(|eol| eol.major == version.major && eol.minor == version.minor && eol.date < today)
    }
}

/// Resolved facts about the hosting runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDescriptor {
    pub name: String,
    pub version: RuntimeVersion,
    pub is_past_eol: bool,
    pub jit_enabled: bool,
    /// `None` when the host did not say.
    pub sapi: Option<String>,
}

impl RuntimeDescriptor {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version: RuntimeVersion::Known(version),
            is_past_eol: false,
            jit_enabled: false,
            sapi: None,
        }
    }

    /// Descriptor used when nothing could be resolved at all.
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_RUNTIME.to_string(),
            version: RuntimeVersion::Unknown,
            is_past_eol: false,
            jit_enabled: false,
            sapi: None,
        }
    }

    pub fn past_eol(mut self, past_eol: bool) -> Self {
        self.is_past_eol = past_eol;
        self
    }

    pub fn with_jit(mut self, enabled: bool) -> Self {
        self.jit_enabled = enabled;
        self
    }

    pub fn with_sapi(mut self, sapi: impl Into<String>) -> Self {
        self.sapi = Some(sapi.into());
        self
    }

    /// Interpret raw host facts against a support policy.
    pub fn from_facts(facts: RuntimeFacts, policy: &SupportPolicy, today: NaiveDate) -> Self {
        let name = facts
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_RUNTIME.to_string());

        let version = match facts.version.as_deref().and_then(Version::parse) {
            Some(v) => RuntimeVersion::Known(v),
            None => {
                warn!(runtime = %name, raw = ?facts.version, "Runtime version unresolved");
                RuntimeVersion::Unknown
            }
        };

        Self {
            is_past_eol: policy.is_past_eol(&version, today),
            name,
            version,
            jit_enabled: facts.jit_enabled,
            sapi: facts.sapi.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Resolve the runtime descriptor from the host.
pub fn resolve(probe: &dyn HostProbe, policy: &SupportPolicy, today: NaiveDate) -> RuntimeDescriptor {
    match probe.runtime_facts() {
        Ok(facts) => RuntimeDescriptor::from_facts(facts, policy, today),
        Err(err) => {
            warn!(error = %err, "Could not query runtime facts");
            RuntimeDescriptor::unknown()
        }
    }
}
