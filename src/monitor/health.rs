//! Liveness polling and restart-on-failure for the managed service.

use std::fmt;
use std::io;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::shutdown::ShutdownFlag;
use crate::shipper::{LabelSet, Level, LokiClient};

/// Bound on one `systemctl is-active` round trip.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on one restart attempt.
const RESTART_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll slice while waiting on a spawned child.
const CHILD_POLL: Duration = Duration::from_millis(25);

/// Closed set of liveness statuses. Query failures never escape as errors;
/// they are folded into `Timeout` or `Error` so the check loop cannot crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Liveness {
    /// Unit is running.
    Active,
    /// Unit is starting up; treated as healthy.
    Activating,
    /// Unit is stopped.
    Inactive,
    /// Unit entered the failed state.
    Failed,
    /// The status query itself did not return in time.
    Timeout,
    /// The status query failed outright (spawn error, unreadable output).
    Error(String),
    /// Any other status string the service manager reports.
    Other(String),
}

impl Liveness {
    /// Parse a service-manager status word.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "active" => Self::Active,
            "activating" => Self::Activating,
            "inactive" => Self::Inactive,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Only `active` and `activating` count as healthy; everything else
    /// triggers a restart.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Active | Self::Activating)
    }
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Activating => write!(f, "activating"),
            Self::Inactive => write!(f, "inactive"),
            Self::Failed => write!(f, "failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error(detail) => write!(f, "error: {detail}"),
            Self::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Seam over the host's service manager. Both operations enforce their
/// timeouts on the caller side so a wedged manager cannot stall the loop.
pub trait ServiceManager: Send {
    /// Current liveness of `unit`. Must not panic or block past its timeout.
    fn query(&self, unit: &str) -> Liveness;

    /// One restart attempt for `unit`. The error string carries the failure
    /// detail for the critical-level log entry.
    fn restart(&self, unit: &str) -> std::result::Result<(), String>;
}

/// Run a child to completion, killing it at the deadline.
/// `Ok(None)` means the deadline was hit.
fn run_with_timeout(command: &mut Command, timeout: Duration) -> io::Result<Option<Output>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return child.wait_with_output().map(Some),
            Ok(None) => {}
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(CHILD_POLL);
    }
}

/// `systemctl`-backed service manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemctlManager;

impl ServiceManager for SystemctlManager {
    fn query(&self, unit: &str) -> Liveness {
        let mut command = Command::new("systemctl");
        command.args(["is-active", unit]);
        match run_with_timeout(&mut command, QUERY_TIMEOUT) {
            // `is-active` exits non-zero for any non-active unit but still
            // prints the status word; the word is what matters.
            Ok(Some(output)) => {
                Liveness::parse(String::from_utf8_lossy(&output.stdout).trim())
            }
            Ok(None) => Liveness::Timeout,
            Err(err) => Liveness::Error(err.to_string()),
        }
    }

    fn restart(&self, unit: &str) -> std::result::Result<(), String> {
        let mut command = Command::new("systemctl");
        command.args(["restart", unit]);
        match run_with_timeout(&mut command, RESTART_TIMEOUT) {
            Ok(Some(output)) if output.status.success() => Ok(()),
            Ok(Some(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = stderr.trim();
                if detail.is_empty() {
                    Err(format!("systemctl restart exited with {}", output.status))
                } else {
                    Err(detail.to_string())
                }
            }
            Ok(None) => Err(format!(
                "systemctl restart timed out after {}s",
                RESTART_TIMEOUT.as_secs()
            )),
            Err(err) => Err(err.to_string()),
        }
    }
}

/// Periodic liveness check with single-attempt restart on failure.
pub struct HealthChecker {
    manager: Box<dyn ServiceManager>,
    client: Arc<LokiClient>,
    unit: String,
}

impl HealthChecker {
    /// Checker for `unit`, reporting through `client`.
    pub fn new(manager: Box<dyn ServiceManager>, client: Arc<LokiClient>, unit: impl Into<String>) -> Self {
        Self {
            manager,
            client,
            unit: unit.into(),
        }
    }

    /// One query; unhealthy statuses trigger exactly one restart attempt.
    /// A failed restart is not retried here — the next cycle re-detects.
    pub fn check_cycle(&self) {
        let status = self.manager.query(&self.unit);
        if !status.is_healthy() {
            self.restart_service(&status);
        }
    }

    fn restart_service(&self, status: &Liveness) {
        let labels = LabelSet::new().with("action", "restart");
        let _ = self.client.push_event(
            Level::Error,
            format!(
                "Service {} is down (status: {status}). Attempting restart.",
                self.unit
            ),
            labels.clone(),
        );
        match self.manager.restart(&self.unit) {
            Ok(()) => {
                let _ = self.client.push_event(
                    Level::Info,
                    format!("Service {} restarted successfully.", self.unit),
                    labels,
                );
            }
            Err(detail) => {
                let _ = self.client.push_event(
                    Level::Critical,
                    format!("Failed to restart {}: {detail}", self.unit),
                    labels,
                );
            }
        }
    }

    /// Check loop. The interval is a fixed wait from the end of one cycle to
    /// the start of the next, not wall-clock aligned.
    pub fn run(&self, interval: Duration, shutdown: &ShutdownFlag) {
        println!(
            "Starting health check loop (interval: {}s)...",
            interval.as_secs()
        );
        while !shutdown.is_requested() {
            self.check_cycle();
            if shutdown.wait(interval) {
                break;
            }
        }
    }
}
