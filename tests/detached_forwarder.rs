// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! A host that exits right after reporting must not lose the event.
//!
//! The test re-executes its own binary as the "host": the child reports one
//! decision through a forwarder and calls `exit` immediately. The parent then
//! checks that the forwarder still received the line. Kept alone in this
//! file so no other test forks while the forwarder script is being written.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use gatekeeper::telemetry::{Forwarder, ReporterConfig, TelemetryReporter, POINT_COMPLETE};
use gatekeeper::{InjectionDecision, RuntimeDescriptor, Version};

const HOST_FORWARDER_VAR: &str = "GATEKEEPER_TEST_HOST_FORWARDER";
const ATTEMPTS: usize = 5;

/// Report one decision and exit with no teardown at all.
fn act_as_host(forwarder: &str) -> ! {
    let reporter =
        TelemetryReporter::forwarding(Forwarder::new(forwarder), ReporterConfig::default());
    let runtime = RuntimeDescriptor::new("php", Version::new(8, 3, 4)).with_sapi("cli");
    reporter.report(&InjectionDecision::proceeded(), &runtime);
    std::process::exit(0);
}

/// Forwarder that publishes the received line atomically once stdin closes.
fn write_forwarder(dir: &Path, out: &Path) -> PathBuf {
    let script = dir.join("forwarder.sh");
    std::fs::write(
        &script,
        format!("#!/bin/sh\ncat > '{0}.part' && mv '{0}.part' '{0}'\n", out.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn wait_for(path: &Path, budget: Duration) -> Option<String> {
    let start = Instant::now();
    while start.elapsed() < budget {
        if let Ok(content) = std::fs::read_to_string(path) {
            return Some(content);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    None
}

#[test]
fn forwarder_outlives_host() {
    if let Ok(forwarder) = std::env::var(HOST_FORWARDER_VAR) {
        act_as_host(&forwarder);
    }

    let exe = std::env::current_exe().unwrap();
    for attempt in 0..ATTEMPTS {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("received.json");
        let script = write_forwarder(temp.path(), &out);

        let status = Command::new(&exe)
            .args(["forwarder_outlives_host", "--exact", "--nocapture", "--test-threads=1"])
            .env(HOST_FORWARDER_VAR, &script)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(status.success(), "attempt {attempt}: host exited with {status}");

        let line = wait_for(&out, Duration::from_secs(5))
            .unwrap_or_else(|| panic!("attempt {attempt}: forwarder never received the event"));
        let json: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(json["points"][0]["name"], POINT_COMPLETE);
        assert_eq!(json["metadata"]["runtime_version"], "8.3.4");
    }
}
