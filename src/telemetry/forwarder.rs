// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! External telemetry forwarder.
//!
//! The forwarder is started on the reporting thread and fed the event before
//! `report` returns, so the event survives a host that exits right away. The
//! child is never killed on drop and never awaited by the host path; the
//! reporter's worker only reaps it when it gets the chance.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::TelemetryError;

use super::event::TelemetryEvent;

/// Argument telling the forwarder which payload kind it receives on stdin.
pub const FORWARDER_PAYLOAD_KIND: &str = "library_entrypoint";

/// Default time a forwarder gets to consume one event before it is killed.
pub const DEFAULT_FORWARDER_TIMEOUT: Duration = Duration::from_secs(2);

const REAP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Launches `<path> library_entrypoint` with the event as one JSON line on stdin.
#[derive(Debug, Clone)]
pub struct Forwarder {
    path: PathBuf,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: DEFAULT_FORWARDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start the forwarder, write the event and close its stdin.
    ///
    /// Returns once the payload is in the pipe. The child runs in its own
    /// process group so signals aimed at the host's group do not reach it.
    pub fn launch(&self, event: &TelemetryEvent) -> Result<Child, TelemetryError> {
        let payload = event.to_json_line()?;

        let mut command = Command::new(&self.path);
        command
            .arg(FORWARDER_PAYLOAD_KIND)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .map_err(|e| TelemetryError::Spawn(format!("{}: {e}", self.path.display())))?;

        // Dropping the handle closes the pipe, which is the forwarder's end of input.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(payload.as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err.into());
            }
        }

        debug!(forwarder = %self.path.display(), pid = child.id(), "Forwarder launched");
        Ok(child)
    }
}

/// Wait for a launched forwarder to exit, killing it once `budget` runs out.
pub(crate) async fn reap(mut child: Child, budget: Duration) -> Result<(), TelemetryError> {
    let deadline = Instant::now() + budget;
    loop {
        match child.try_wait()? {
            Some(status) if status.success() => return Ok(()),
            Some(status) => return Err(TelemetryError::ExitStatus(status.code())),
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(TelemetryError::Timeout(budget.as_millis() as u64));
            }
            None => sleep(REAP_POLL_INTERVAL).await,
        }
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

    #[cfg(unix)]
    fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_missing_binary() {
        let result = Forwarder::new("/nonexistent/telemetry-forwarder").launch(&event());
        assert!(matches!(result, Err(TelemetryError::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_forwarder_receives_payload() {
        let temp = tempfile::TempDir::new().unwrap();
        let out = temp.path().join("received.json");
        let path = script(
            &temp,
            "forwarder.sh",
            &format!("echo \"$1\" > '{0}.kind'\ncat > '{0}'", out.display()),
        );

        let forwarder = Forwarder::new(&path);
        let child = forwarder.launch(&event()).unwrap();
        reap(child, forwarder.timeout()).await.unwrap();

        let received = std::fs::read_to_string(&out).unwrap();
        let json: serde_json::Value = serde_json::from_str(received.trim()).unwrap();
        assert_eq!(json["points"][0]["name"], "library_entrypoint.complete");
        assert_eq!(json["metadata"]["runtime_name"], "php");

        let kind = std::fs::read_to_string(format!("{}.kind", out.display())).unwrap();
        assert_eq!(kind.trim(), FORWARDER_PAYLOAD_KIND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = script(&temp, "failing.sh", "cat > /dev/null\nexit 3");

        let child = Forwarder::new(&path).launch(&event()).unwrap();
        let result = reap(child, DEFAULT_FORWARDER_TIMEOUT).await;
        assert!(matches!(result, Err(TelemetryError::ExitStatus(Some(3)))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_forwarder_is_killed() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = script(&temp, "slow.sh", "cat > /dev/null\nsleep 5");

        let forwarder = Forwarder::new(&path).with_timeout(Duration::from_millis(100));
        let child = forwarder.launch(&event()).unwrap();

        let start = std::time::Instant::now();
        let result = reap(child, forwarder.timeout()).await;
        assert!(matches!(result, Err(TelemetryError::Timeout(100))));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_returns_before_forwarder_exits() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = script(&temp, "slow.sh", "cat > /dev/null\nsleep 2");

        let start = std::time::Instant::now();
        let mut child = Forwarder::new(&path).launch(&event()).unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));

        child.kill().unwrap();
        child.wait().unwrap();
    }
}
