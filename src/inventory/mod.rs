// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Host inspection: the module inventory and the runtime descriptor.
//!
//! The host exposes its facts through [`HostProbe`]. Collection never fails
//! outward: a probe error degrades to an empty, incomplete inventory (which
//! the decision engine default-denies) or to an unknown runtime version.

pub mod runtime;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::InventoryError;

pub use runtime::{
    resolve, EndOfLife, RuntimeDescriptor, RuntimeFacts, RuntimeVersion, SupportPolicy, Version,
};

/// What an active component is, as far as compatibility is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// The instrumentation library the gatekeeper guards.
    Target,
    Debugger,
    Profiler,
    Other,
}

/// One component active in the host process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub kind: ModuleKind,
}

impl ModuleRecord {
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            version: None,
            kind,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Point-in-time snapshot of the host's active modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInventory {
    modules: Vec<ModuleRecord>,
    complete: bool,
}

impl ModuleInventory {
    /// A successfully enumerated inventory.
    pub fn collected(modules: Vec<ModuleRecord>) -> Self {
        Self {
            modules,
            complete: true,
        }
    }

    /// Enumeration failed; the host state is unknown.
    pub fn unavailable() -> Self {
        Self {
            modules: Vec::new(),
            complete: false,
        }
    }

    pub fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    /// Whether enumeration succeeded. An incomplete inventory is never treated as safe.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl From<Vec<ModuleRecord>> for ModuleInventory {
    fn from(modules: Vec<ModuleRecord>) -> Self {
        Self::collected(modules)
    }
}

/// Read-only access to facts about the host process.
#[cfg_attr(test, mockall::automock)]
pub trait HostProbe: Send + Sync {
    /// Enumerate the components currently active in the host.
    fn modules(&self) -> Result<Vec<ModuleRecord>, InventoryError>;

    /// Describe the hosting runtime.
    fn runtime_facts(&self) -> Result<RuntimeFacts, InventoryError>;
}

/// Take a snapshot of the host's modules.
pub fn snapshot(probe: &dyn HostProbe) -> ModuleInventory {
    match probe.modules() {
        Ok(modules) => {
            debug!(count = modules.len(), "Collected module inventory");
            ModuleInventory::collected(modules)
        }
        Err(err) => {
            warn!(error = %err, "Could not enumerate host modules, assuming unsafe");
            ModuleInventory::unavailable()
        }
    }
}

/// Host snapshot serialized to disk, used by the diagnostic CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticProbe {
    #[serde(default)]
    pub runtime: RuntimeFacts,
    #[serde(default)]
    pub modules: Vec<ModuleRecord>,
}

impl StaticProbe {
    pub fn new(runtime: RuntimeFacts, modules: Vec<ModuleRecord>) -> Self {
        Self { runtime, modules }
    }

    pub fn from_json(content: &str) -> Result<Self, InventoryError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, InventoryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl HostProbe for StaticProbe {
    fn modules(&self) -> Result<Vec<ModuleRecord>, InventoryError> {
        Ok(self.modules.clone())
    }

    fn runtime_facts(&self) -> Result<RuntimeFacts, InventoryError> {
        Ok(self.runtime.clone())
    }
}
